use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::{is_duplicate_key_error, Coll, Id};

/// Core vote data: a single user's single choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteCore {
    /// The user who cast this vote. At most one vote may exist per user,
    /// enforced by a unique index on this field.
    pub voter_id: Id,
    /// The chosen option. Always a member of the configured option set,
    /// since [`record_vote`] rejects anything else before insertion.
    pub option: String,
    /// When the vote was cast.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl VoteCore {
    /// Create a new vote, stamped with the current time.
    pub fn new(voter_id: Id, option: String) -> Self {
        Self {
            voter_id,
            option,
            created_at: Utc::now(),
        }
    }
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

impl DerefMut for Vote {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.vote
    }
}

/// The outcome of attempting to record a vote.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastOutcome {
    /// The vote was persisted; this user had not voted before.
    Recorded,
    /// The user had already voted; nothing was written.
    AlreadyVoted,
}

/// Return true if a vote exists for the given user.
pub async fn has_voted(votes: &Coll<Vote>, voter_id: Id) -> Result<bool> {
    let existing = votes.find_one(doc! {"voter_id": *voter_id}, None).await?;
    Ok(existing.is_some())
}

/// Record the given user's vote, if they have not voted before.
///
/// The one-vote-per-user rule rests entirely on the unique index over
/// `voter_id`: a duplicate key error on insert means a vote already exists
/// (whatever its option) and is reported as [`CastOutcome::AlreadyVoted`].
/// There is deliberately no read-then-write here, so concurrent submissions
/// cannot produce a second vote.
pub async fn record_vote(
    votes: &Coll<NewVote>,
    options: &[String],
    voter_id: Id,
    option: String,
) -> Result<CastOutcome> {
    if !options.contains(&option) {
        return Err(Error::InvalidOption(option));
    }

    let vote = NewVote::new(voter_id, option);
    match votes.insert_one(&vote, None).await {
        Ok(_) => Ok(CastOutcome::Recorded),
        Err(err) if is_duplicate_key_error(&err) => Ok(CastOutcome::AlreadyVoted),
        Err(err) => Err(err.into()),
    }
}

/// Count the votes for each option in a single aggregation pass.
///
/// Options nobody has voted for are simply absent from the map; zero-filling
/// is left to [`PollResults`](crate::model::api::results::PollResults), which
/// knows the configured option set.
pub async fn count_per_option(votes: &Coll<Vote>) -> Result<HashMap<String, u64>> {
    let pipeline = vec![doc! {
        "$group": {
            "_id": "$option",
            "votes": { "$sum": 1 },
        }
    }];

    let mut groups = votes.aggregate(pipeline, None).await?;
    let mut counts = HashMap::new();
    while let Some(group) = groups.try_next().await? {
        let group: OptionVotes = mongodb::bson::from_document(group)?;
        counts.insert(group.option, group.votes);
    }
    Ok(counts)
}

/// One `$group` result row from [`count_per_option`].
#[derive(Deserialize)]
struct OptionVotes {
    #[serde(rename = "_id")]
    option: String,
    votes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    use mongodb::Database;
    use rocket::futures::future::join_all;

    fn example_options() -> Vec<String> {
        ["Python", "JavaScript", "Java", "C#"]
            .map(String::from)
            .to_vec()
    }

    #[backend_test]
    async fn record_and_query(db: Database, votes: Coll<Vote>) {
        let new_votes = Coll::<NewVote>::from_db(&db);
        let options = example_options();
        let voter_id = Id::new();

        // Fresh users have not voted.
        assert!(!has_voted(&votes, voter_id).await.unwrap());

        // A valid first vote is recorded.
        let outcome = record_vote(&new_votes, &options, voter_id, "Java".to_string())
            .await
            .unwrap();
        assert_eq!(outcome, CastOutcome::Recorded);
        assert!(has_voted(&votes, voter_id).await.unwrap());

        // The stored vote is the one submitted.
        let stored = votes
            .find_one(doc! {"voter_id": *voter_id}, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.voter_id, voter_id);
        assert_eq!(stored.option, "Java");

        // Other users are unaffected.
        assert!(!has_voted(&votes, Id::new()).await.unwrap());
    }

    #[backend_test]
    async fn first_vote_wins(db: Database, votes: Coll<Vote>) {
        let new_votes = Coll::<NewVote>::from_db(&db);
        let options = example_options();
        let voter_id = Id::new();

        let outcome = record_vote(&new_votes, &options, voter_id, "Java".to_string())
            .await
            .unwrap();
        assert_eq!(outcome, CastOutcome::Recorded);

        // A resubmission is swallowed, even with a different option.
        let outcome = record_vote(&new_votes, &options, voter_id, "Java".to_string())
            .await
            .unwrap();
        assert_eq!(outcome, CastOutcome::AlreadyVoted);
        let outcome = record_vote(&new_votes, &options, voter_id, "Python".to_string())
            .await
            .unwrap();
        assert_eq!(outcome, CastOutcome::AlreadyVoted);

        // Exactly one vote exists, with the original option.
        let stored: Vec<Vote> = votes
            .find(doc! {"voter_id": *voter_id}, None)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].option, "Java");
    }

    #[backend_test]
    async fn concurrent_votes_record_exactly_one(db: Database, new_votes: Coll<NewVote>) {
        let options = example_options();
        let voter_id = Id::new();

        // Race eight submissions for the same user, cycling through the
        // options so the contention is purely on the user identity.
        let attempts = options
            .iter()
            .cycle()
            .take(8)
            .map(|option| record_vote(&new_votes, &options, voter_id, option.clone()));
        let outcomes = join_all(attempts).await;

        let recorded = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, Ok(CastOutcome::Recorded)))
            .count();
        let already_voted = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, Ok(CastOutcome::AlreadyVoted)))
            .count();
        assert_eq!(recorded, 1);
        assert_eq!(already_voted, outcomes.len() - 1);

        // And only one vote made it to the database.
        let stored = Coll::<Vote>::from_db(&db)
            .count_documents(doc! {"voter_id": *voter_id}, None)
            .await
            .unwrap();
        assert_eq!(stored, 1);
    }

    #[backend_test]
    async fn invalid_option_rejected_before_storage(db: Database, votes: Coll<Vote>) {
        let new_votes = Coll::<NewVote>::from_db(&db);
        let options = example_options();
        let voter_id = Id::new();

        let result = record_vote(&new_votes, &options, voter_id, "Rust".to_string()).await;
        assert!(matches!(result, Err(Error::InvalidOption(_))));

        // Nothing was written, so the user can still vote.
        assert!(!has_voted(&votes, voter_id).await.unwrap());
        let stored = votes.count_documents(None, None).await.unwrap();
        assert_eq!(stored, 0);

        let outcome = record_vote(&new_votes, &options, voter_id, "Python".to_string())
            .await
            .unwrap();
        assert_eq!(outcome, CastOutcome::Recorded);
    }

    #[backend_test]
    async fn count_per_option_groups_votes(db: Database, votes: Coll<Vote>) {
        let new_votes = Coll::<NewVote>::from_db(&db);
        let seeded = ["Python", "Python", "Python", "JavaScript"]
            .map(|option| NewVote::new(Id::new(), option.to_string()));
        new_votes.insert_many(seeded, None).await.unwrap();

        let counts = count_per_option(&votes).await.unwrap();
        assert_eq!(counts.get("Python"), Some(&3));
        assert_eq!(counts.get("JavaScript"), Some(&1));
        // Unvoted options are absent, not zero.
        assert_eq!(counts.len(), 2);
    }

    #[backend_test]
    async fn count_per_option_empty(db: Database) {
        let votes = Coll::<Vote>::from_db(&db);
        let counts = count_per_option(&votes).await.unwrap();
        assert!(counts.is_empty());
    }
}
