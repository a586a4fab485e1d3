use actix_web::{web, HttpResponse};

use crate::{
    errors::ServerError,
    exchange::NoteExchange,
    models::note::{CreatedId, FetchedNote, NewNote},
};

pub async fn create(
    input: web::Json<NewNote>,
    exchange: web::Data<NoteExchange>,
) -> Result<HttpResponse, ServerError> {
    let sealed = input.into_inner().into_sealed().map_err(ServerError::UserError)?;

    let exchange = exchange.into_inner();
    let id = web::block(move || exchange.deposit(sealed))
        .await?
        .map_err(|e| {
            log::error!("Error creating note: {e}");
            ServerError::from(e)
        })?;

    Ok(HttpResponse::Created().json(CreatedId { id }))
}

// this response has to be identical for unknown, read and expired notes so
// nobody can tell which one it was
pub async fn fetch(
    note_id: web::Path<String>,
    exchange: web::Data<NoteExchange>,
) -> Result<HttpResponse, ServerError> {
    let note_id = note_id.into_inner();
    if note_id.trim().is_empty() {
        return Err(ServerError::BadRequest("Note ID is required".into()));
    }

    let exchange = exchange.into_inner();
    let record = web::block(move || exchange.withdraw(&note_id)).await?;

    match record {
        Ok(record) => Ok(HttpResponse::Ok().json(FetchedNote::from(&record))),
        Err(e) => {
            if e.is_retryable() {
                log::error!("Error retrieving note: {e}");
            }
            Err(e.into())
        }
    }
}
