diesel::table! {
    notes (id) {
        id -> Varchar,
        encrypted_content -> Bytea,
        iv -> Bytea,
        salt -> Bytea,
        created_at -> Timestamp,
        expires_at -> Timestamp,
    }
}
