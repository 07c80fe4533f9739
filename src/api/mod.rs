use rocket::Route;

mod auth;
mod poll;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(poll::routes());
    routes
}
