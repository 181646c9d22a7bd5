use std::path::PathBuf;

use palmkiosk_config::ResolvedConfig;
use palmkiosk_core::palm::{canonical_id, Hand, ImageRef, UserRecord};
use serde::Serialize;

use crate::cli::{StoreArgs, UsersCommands};
use crate::config;
use crate::errors::AppResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub left_images: usize,
    pub right_images: usize,
}

impl From<&UserRecord> for UserSummary {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            left_images: record.images_for(Hand::Left).count(),
            right_images: record.images_for(Hand::Right).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageEntry {
    pub path: PathBuf,
    pub hand: Hand,
    pub sequence: u32,
}

impl From<ImageRef> for ImageEntry {
    fn from(image: ImageRef) -> Self {
        Self {
            path: image.path,
            hand: image.hand,
            sequence: image.sequence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UsersOutcome {
    List {
        users: Vec<UserSummary>,
    },
    Search {
        query: String,
        users: Vec<UserSummary>,
    },
    Delete {
        user: UserSummary,
        images_removed: usize,
        images_missing: usize,
        images_failed: usize,
    },
    Images {
        id: String,
        images: Vec<ImageEntry>,
    },
}

pub fn run_users(command: &UsersCommands, store: &StoreArgs) -> AppResult<UsersOutcome> {
    let settings = config::load_settings(store)?;
    users_with_config(command, &settings.resolved)
}

pub fn users_with_config(
    command: &UsersCommands,
    resolved: &ResolvedConfig,
) -> AppResult<UsersOutcome> {
    let mut kiosk = config::open_kiosk(resolved)?;
    let outcome = match command {
        UsersCommands::List => UsersOutcome::List {
            users: summarize(&kiosk.get_all_users()),
        },
        UsersCommands::Search(args) => UsersOutcome::Search {
            query: args.query.clone(),
            users: summarize(&kiosk.search(&args.query)),
        },
        UsersCommands::Delete(args) => {
            let removed = kiosk.delete_user(args.id.trim())?;
            UsersOutcome::Delete {
                user: UserSummary::from(&removed.record),
                images_removed: removed.assets_removed,
                images_missing: removed.assets_missing,
                images_failed: removed.assets_failed,
            }
        }
        UsersCommands::Images(args) => {
            let id = canonical_id(args.id.trim());
            let images = kiosk.get_images(&id);
            UsersOutcome::Images {
                id,
                images: images.into_iter().map(ImageEntry::from).collect(),
            }
        }
    };
    Ok(outcome)
}

fn summarize(records: &[UserRecord]) -> Vec<UserSummary> {
    records.iter().map(UserSummary::from).collect()
}
