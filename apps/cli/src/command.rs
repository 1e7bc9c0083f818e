use rowguard_core::{AppError, AppResult, TeamId};
use rowguard_domain::{RecordType, UserId};

const USAGE: &str = "usage: rowguard-cli [migrate | plan | reconcile | \
                     check <user_id> <permission> [team_id] | records <user_id|-> <record_type>]";

/// Subcommand selected on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Migrate,
    Plan,
    Reconcile,
    Check {
        user_id: UserId,
        permission: String,
        team_id: Option<TeamId>,
    },
    Records {
        user_id: Option<UserId>,
        record_type: RecordType,
    },
}

impl Command {
    /// Parses the arguments after the program name. No arguments means `reconcile`.
    pub fn parse(args: impl IntoIterator<Item = String>) -> AppResult<Self> {
        let args: Vec<String> = args.into_iter().collect();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        match args.as_slice() {
            [] | ["reconcile"] => Ok(Self::Reconcile),
            ["migrate"] => Ok(Self::Migrate),
            ["plan"] => Ok(Self::Plan),
            ["check", user_id, permission] => Ok(Self::Check {
                user_id: parse_user_id(user_id)?,
                permission: parse_permission(permission)?,
                team_id: None,
            }),
            ["check", user_id, permission, team_id] => Ok(Self::Check {
                user_id: parse_user_id(user_id)?,
                permission: parse_permission(permission)?,
                team_id: Some(parse_team_id(team_id)?),
            }),
            ["records", "-", record_type] => Ok(Self::Records {
                user_id: None,
                record_type: RecordType::new(*record_type)?,
            }),
            ["records", user_id, record_type] => Ok(Self::Records {
                user_id: Some(parse_user_id(user_id)?),
                record_type: RecordType::new(*record_type)?,
            }),
            _ => Err(AppError::Validation(USAGE.to_owned())),
        }
    }
}

fn parse_user_id(value: &str) -> AppResult<UserId> {
    value.parse::<UserId>()
}

fn parse_permission(value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(
            "permission name must not be empty".to_owned(),
        ));
    }

    Ok(trimmed.to_owned())
}

fn parse_team_id(value: &str) -> AppResult<TeamId> {
    uuid::Uuid::parse_str(value.trim())
        .map(TeamId::from_uuid)
        .map_err(|error| AppError::Validation(format!("invalid team id '{value}': {error}")))
}
