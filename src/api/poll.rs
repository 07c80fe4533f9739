use rocket::{serde::json::Json, Route, State};

use crate::{
    error::Result,
    model::{
        api::{
            auth::AuthToken,
            poll::{PollDescription, VoteReceipt, VoteSpec},
            results::PollResults,
        },
        db::vote::{self, NewVote, Vote},
        mongodb::Coll,
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![poll, cast_vote, results]
}

/// Describe the poll: the votable options, and whether this user has voted.
#[get("/poll")]
async fn poll(
    token: AuthToken,
    votes: Coll<Vote>,
    config: &State<Config>,
) -> Result<Json<PollDescription>> {
    let voted = vote::has_voted(&votes, token.id).await?;
    Ok(Json(PollDescription {
        options: config.poll_options().to_vec(),
        voted,
    }))
}

/// Cast the authenticated user's vote.
///
/// Succeeds with an `already_voted` receipt if they have voted before; the
/// stored vote is never changed.
#[post("/poll/votes", data = "<spec>", format = "json")]
async fn cast_vote(
    token: AuthToken,
    spec: Json<VoteSpec>,
    votes: Coll<NewVote>,
    config: &State<Config>,
) -> Result<Json<VoteReceipt>> {
    let outcome = vote::record_vote(&votes, config.poll_options(), token.id, spec.0.option).await?;
    Ok(Json(VoteReceipt { outcome }))
}

/// Current standings. Does not require authentication.
#[get("/poll/results")]
async fn results(votes: Coll<Vote>, config: &State<Config>) -> Result<Json<PollResults>> {
    let counts = vote::count_per_option(&votes).await?;
    Ok(Json(PollResults::new(config.poll_options(), counts)))
}
