use actix_web::web;

pub mod note;

pub async fn index() -> impl actix_web::Responder {
    actix_web::HttpResponse::Ok().finish()
}

/// Routes shared by the server and the test harness. Expects a
/// `web::Data<NoteExchange>` to be registered on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index)).service(
        web::scope("/api/notes")
            .route("", web::post().to(note::create))
            .route("/{id}", web::get().to(note::fetch)),
    );
}
