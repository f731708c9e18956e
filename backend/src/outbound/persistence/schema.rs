//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Coordinates are
//! stored as plain `DOUBLE PRECISION` columns; proximity queries prefilter on
//! a bounding box and refine distances in the domain.

diesel::table! {
    /// Registered accounts. `email` carries a unique index.
    users (id) {
        id -> Uuid,
        name -> Varchar,
        email -> Varchar,
        /// Argon2 PHC string; never leaves the persistence layer except for
        /// credential checks.
        password_hash -> Text,
        roles -> Array<Text>,
        phone -> Varchar,
        address -> Text,
        latitude -> Float8,
        longitude -> Float8,
        donation_score -> Int4,
        profile_image -> Nullable<Text>,
        is_active -> Bool,
        last_login -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Vendor listings. Withdrawn listings keep their row with `is_active`
    /// cleared.
    products (id) {
        id -> Uuid,
        vendor_id -> Uuid,
        name -> Varchar,
        description -> Nullable<Text>,
        category -> Varchar,
        quantity -> Int4,
        unit -> Varchar,
        price -> Nullable<Float8>,
        expires_at -> Nullable<Timestamptz>,
        image_urls -> Array<Text>,
        latitude -> Float8,
        longitude -> Float8,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    donations (id) {
        id -> Uuid,
        product_id -> Uuid,
        vendor_id -> Uuid,
        requested_by -> Nullable<Uuid>,
        status -> Varchar,
        quantity -> Int4,
        notes -> Nullable<Text>,
        completed_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(products -> users (vendor_id));
diesel::joinable!(donations -> products (product_id));

diesel::allow_tables_to_appear_in_same_query!(users, products, donations);
