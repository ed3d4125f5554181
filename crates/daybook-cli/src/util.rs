use anyhow::{anyhow, Result};
use daybook_core::error::CoreError;
use daybook_core::repository::Repository;
use uuid::Uuid;

const MIN_SHORT_ID_LEN: usize = 2;

fn check_length(short_id: &str) -> Result<()> {
    if short_id.len() < MIN_SHORT_ID_LEN {
        return Err(anyhow!(CoreError::InvalidInput(
            "Short ID must be at least 2 characters long.".to_string()
        )));
    }
    Ok(())
}

fn pick_one(kind: &str, short_id: &str, matches: Vec<(Uuid, String)>) -> Result<Uuid> {
    match matches.len() {
        1 => Ok(matches[0].0),
        0 => Err(anyhow!(CoreError::NotFound(format!(
            "No {} found with ID prefix '{}'",
            kind, short_id
        )))),
        _ => {
            let info: Vec<(String, String)> = matches
                .into_iter()
                .map(|(id, label)| (id.to_string(), label))
                .collect();
            Err(anyhow!(CoreError::AmbiguousId(info)))
        }
    }
}

pub async fn resolve_routine_id<R: Repository + Sync>(repo: &R, short_id: &str) -> Result<Uuid> {
    check_length(short_id)?;
    let routines = repo.find_routines_by_short_id_prefix(short_id).await?;
    pick_one(
        "routine",
        short_id,
        routines.into_iter().map(|r| (r.id, r.name)).collect(),
    )
}

pub async fn resolve_activity_id<R: Repository + Sync>(repo: &R, short_id: &str) -> Result<Uuid> {
    check_length(short_id)?;
    let activities = repo.find_activities_by_short_id_prefix(short_id).await?;
    pick_one(
        "activity",
        short_id,
        activities
            .into_iter()
            .map(|a| (a.id, format!("{} on {}", a.name, a.occurrence_date)))
            .collect(),
    )
}

/// First eight hex digits of an id, the form shown in tables.
pub fn short_id(id: &Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}
