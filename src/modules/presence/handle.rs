use actix_web::{get, web};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::{error, success},
    modules::presence::tracker::{PresenceInfo, PresenceTracker},
    utils::ValidatedQuery,
};

/// Comma-separated ids, the shape a friend-list sidebar asks with.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PresenceBatchQuery {
    #[validate(length(min = 1))]
    pub ids: String,
}

#[get("/")]
pub async fn get_presence_batch(
    tracker: web::Data<PresenceTracker>,
    query: ValidatedQuery<PresenceBatchQuery>,
) -> Result<success::Success<Vec<PresenceInfo>>, error::Error> {
    let user_ids = query
        .0
        .ids
        .split(',')
        .map(|raw| raw.trim().parse::<Uuid>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| error::Error::bad_request("ids must be a comma-separated list of UUIDs"))?;

    let presence = tracker.get_presence_batch(&user_ids).await?;

    Ok(success::Success::ok(Some(presence)))
}

#[get("/{user_id}")]
pub async fn get_presence(
    tracker: web::Data<PresenceTracker>,
    user_id: web::Path<Uuid>,
) -> Result<success::Success<PresenceInfo>, error::Error> {
    let presence = tracker.get_presence(*user_id).await?;

    Ok(success::Success::ok(Some(presence)))
}
