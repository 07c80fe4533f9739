use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{AuthToken, AUTH_TOKEN_COOKIE},
            credentials::Credentials,
        },
        db::user::{NewUser, User},
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![register, login, logout]
}

#[post("/auth/register", data = "<credentials>", format = "json")]
pub async fn register(
    cookies: &CookieJar<'_>,
    credentials: Json<Credentials>,
    new_users: Coll<NewUser>,
    config: &State<Config>,
) -> Result<()> {
    // Validate the credentials and hash the password.
    let user: NewUser = credentials.0.try_into()?;

    // Email uniqueness is left to the unique index; checking up front would
    // just race against concurrent registrations.
    let id: Id = match new_users.insert_one(&user, None).await {
        Ok(insertion) => insertion
            .inserted_id
            .as_object_id()
            .unwrap() // Safe because the ID comes directly from the database.
            .into(),
        Err(err) if is_duplicate_key_error(&err) => {
            return Err(Error::BadRequest(format!(
                "Email already in use: {}",
                user.email
            )));
        }
        Err(err) => return Err(err.into()),
    };

    // Registration doubles as login.
    let user = User { id, user };
    let token = AuthToken::new(&user);
    cookies.add(token.into_cookie(config));

    Ok(())
}

#[post("/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<Credentials>,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<()> {
    let with_email = doc! {
        "email": &credentials.email,
    };

    let user = users
        .find_one(with_email, None)
        .await?
        .filter(|user| user.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::Unauthorized(
                "No user found with the provided email and password combination.".to_string(),
            )
        })?;

    let token = AuthToken::new(&user);
    cookies.add(token.into_cookie(config));

    Ok(())
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}

#[cfg(test)]
mod tests {
    use rocket::{http::ContentType, local::asynchronous::Client, serde::json::serde_json::json};

    use super::*;

    #[backend_test]
    async fn register_valid(client: Client, users: Coll<User>) {
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(Credentials::example()).to_string())
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        // Registration leaves the client logged in.
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());

        // The stored user verifies the submitted password.
        let user = users
            .find_one(doc! { "email": &Credentials::example().email }, None)
            .await
            .unwrap()
            .unwrap();
        assert!(user.verify_password(&Credentials::example().password));
    }

    #[backend_test]
    async fn register_duplicate_email(client: Client, users: Coll<User>) {
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(Credentials::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        // Same email, different password; still rejected.
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(
                json!({
                    "email": &Credentials::example().email,
                    "password": "a-different-password",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let count = users.count_documents(None, None).await.unwrap();
        assert_eq!(count, 1);
    }

    #[backend_test]
    async fn register_invalid_credentials(client: Client, users: Coll<User>) {
        for bad_credentials in [
            json!(Credentials::empty()),
            json!({"email": "no-at-sign", "password": "long-enough-password"}),
            json!({"email": "ada@example.com", "password": "short"}),
        ] {
            let response = client
                .post(uri!(register))
                .header(ContentType::JSON)
                .body(bad_credentials.to_string())
                .dispatch()
                .await;

            assert_eq!(Status::BadRequest, response.status());
            assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
        }

        let count = users.count_documents(None, None).await.unwrap();
        assert_eq!(count, 0);
    }

    #[backend_test]
    async fn login_valid(client: Client, users: Coll<NewUser>) {
        // Ensure there is a user to login as.
        users.insert_one(NewUser::example(), None).await.unwrap();

        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(Credentials::example()).to_string())
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
    }

    #[backend_test]
    async fn login_invalid(client: Client, users: Coll<NewUser>) {
        // Ensure there is a user to fail to login as.
        users.insert_one(NewUser::example(), None).await.unwrap();

        // Wrong password.
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(
                json!({
                    "email": &Credentials::example().email,
                    "password": "not-the-right-password",
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));

        // Unknown email.
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(Credentials::example2()).to_string())
            .dispatch()
            .await;

        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
    }

    #[backend_test(voter)]
    async fn logout_voter(client: Client) {
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());

        let response = client.delete(uri!(logout)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
    }

    #[backend_test]
    async fn logout_not_logged_in(client: Client) {
        let response = client.delete(uri!(logout)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
    }
}
