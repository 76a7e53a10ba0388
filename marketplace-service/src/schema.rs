diesel::table! {
    clients (id) {
        id -> Uuid,
        name -> Varchar,
        age -> Int4,
        cpf -> Varchar,
        password_hash -> Varchar,
        photo_path -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    stores (id) {
        id -> Uuid,
        name -> Varchar,
        cnpj -> Varchar,
        cep -> Varchar,
        address -> Varchar,
        complement -> Nullable<Varchar>,
        lot -> Nullable<Varchar>,
        password_hash -> Varchar,
        description -> Nullable<Varchar>,
        photo_path -> Nullable<Varchar>,
        latitude -> Nullable<Float8>,
        longitude -> Nullable<Float8>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    products (id) {
        id -> Uuid,
        store_id -> Uuid,
        name -> Varchar,
        price -> Numeric,
        stock_quantity -> Int4,
        image_path -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    services (id) {
        id -> Uuid,
        store_id -> Uuid,
        name -> Varchar,
        description -> Varchar,
        price -> Numeric,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    service_slots (id) {
        id -> Uuid,
        service_id -> Uuid,
        starts_at -> Timestamptz,
        is_available -> Bool,
    }
}

diesel::table! {
    cart_items (id) {
        id -> Uuid,
        client_id -> Uuid,
        product_id -> Uuid,
        quantity -> Int4,
    }
}

diesel::table! {
    product_reservations (id) {
        id -> Uuid,
        client_id -> Uuid,
        store_id -> Uuid,
        status -> Varchar,
        reserved_at -> Timestamptz,
        expires_at -> Timestamptz,
        pickup_deadline -> Timestamptz,
    }
}

diesel::table! {
    reservation_items (id) {
        id -> Uuid,
        reservation_id -> Uuid,
        product_id -> Uuid,
        quantity -> Int4,
        unit_price -> Numeric,
    }
}

diesel::table! {
    service_appointments (id) {
        id -> Uuid,
        client_id -> Uuid,
        store_id -> Uuid,
        service_id -> Uuid,
        slot_id -> Nullable<Uuid>,
        scheduled_for -> Timestamptz,
        status -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(products -> stores (store_id));
diesel::joinable!(services -> stores (store_id));
diesel::joinable!(service_slots -> services (service_id));
diesel::joinable!(cart_items -> clients (client_id));
diesel::joinable!(cart_items -> products (product_id));
diesel::joinable!(reservation_items -> product_reservations (reservation_id));
diesel::joinable!(reservation_items -> products (product_id));

diesel::allow_tables_to_appear_in_same_query!(
    clients,
    stores,
    products,
    services,
    service_slots,
    cart_items,
    product_reservations,
    reservation_items,
    service_appointments,
);
