use std::collections::HashMap;

use logchef_core::LogchefClient;
use logchef_core::profile::UserTeam;
use logchef_core::sources::Source;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{
    InputSchema, ToolDefinition, client_failure, parse_args, to_value, unknown_tool, upstream,
};
use crate::ToolError;
use crate::categories::ToolCategory;

/// A team granting access to a source, with the caller's role in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub id: i64,
    pub name: String,
    pub role: String,
}

impl From<&UserTeam> for TeamInfo {
    fn from(team: &UserTeam) -> Self {
        Self {
            id: team.id,
            name: team.name.clone(),
            role: team.role.clone(),
        }
    }
}

/// A source annotated with every team through which the caller reaches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceWithTeams {
    #[serde(flatten)]
    pub source: Source,
    pub teams: Vec<TeamInfo>,
}

#[derive(Debug, Deserialize)]
struct TeamSourcesArgs {
    team_id: i64,
}

pub(crate) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "get_team_sources",
            ToolCategory::Sources,
            "Get the sources that belong to a specific team. Requires the team ID as a parameter.",
            InputSchema::new()
                .required_integer("team_id", "The ID of the team to get sources for")
                .build(),
        ),
        ToolDefinition::new(
            "get_sources",
            ToolCategory::Sources,
            "Get all sources that the current user has access to across all their team memberships. Returns sources with their team associations and the user's role in each team.",
            InputSchema::new().build(),
        ),
    ]
}

pub(crate) async fn call(
    name: &str,
    client: &LogchefClient,
    args: Value,
) -> Result<Value, ToolError> {
    match name {
        "get_team_sources" => {
            let args: TeamSourcesArgs = parse_args(args)?;
            let sources = client
                .get_team_sources(args.team_id)
                .await
                .map_err(upstream("get team sources"))?;
            to_value(&sources)
        }
        "get_sources" => {
            let sources = aggregate_sources(client).await?;
            Ok(json!({ "sources": to_value(&sources)? }))
        }
        other => Err(unknown_tool(other)),
    }
}

/// Joins the caller's team memberships with each team's source list.
///
/// Teams are visited one at a time in membership order. A source reachable
/// through several teams appears once, keeping the fields from the first team
/// that returned it, with one `teams` entry per distinct granting team. Any
/// failed fetch aborts the whole aggregation.
pub async fn aggregate_sources(client: &LogchefClient) -> Result<Vec<SourceWithTeams>, ToolError> {
    let teams = client
        .get_user_teams()
        .await
        .map_err(upstream("get user teams"))?;

    let mut merged: Vec<SourceWithTeams> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for team in &teams {
        let sources = client
            .get_team_sources(team.id)
            .await
            .map_err(|e| client_failure(&format!("get sources for team {}", team.id), e))?;

        for source in sources {
            match index.get(&source.id) {
                Some(&position) => {
                    let entry = &mut merged[position];
                    if !entry.teams.iter().any(|t| t.id == team.id) {
                        entry.teams.push(TeamInfo::from(team));
                    }
                }
                None => {
                    index.insert(source.id, merged.len());
                    merged.push(SourceWithTeams {
                        source,
                        teams: vec![TeamInfo::from(team)],
                    });
                }
            }
        }
    }

    tracing::debug!(
        event = "logchef.sources.aggregated",
        teams = teams.len(),
        sources = merged.len(),
        "aggregated sources across teams"
    );
    Ok(merged)
}
