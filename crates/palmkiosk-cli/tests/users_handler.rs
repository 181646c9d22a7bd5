use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use image::GrayImage;
use palmkiosk_cli::cli::{
    EnrollArgs, OutputMode, StoreArgs, UserIdArgs, UserSearchArgs, UsersCommands,
};
use palmkiosk_cli::commands::{CommandHandler, UsersHandler};
use palmkiosk_cli::enroll::enroll_with_config;
use palmkiosk_cli::errors::AppError;
use palmkiosk_cli::users::{users_with_config, UsersOutcome};
use palmkiosk_config::{ConfigFile, ResolvedConfig};
use palmkiosk_core::palm::Hand;
use tempfile::TempDir;

const ALICE: &str = "110101199001010011";
const BOB: &str = "11010119920202002X";

fn setup(tmp: &TempDir) -> ResolvedConfig {
    let resolved = ResolvedConfig::from_raw_with_data_dir(
        ConfigFile {
            samples_per_hand: Some(1),
            ..ConfigFile::default()
        },
        tmp.path(),
    );
    enroll(&resolved, tmp.path(), "Alice Zhang", ALICE);
    enroll(&resolved, tmp.path(), "Bob", BOB);
    resolved
}

fn enroll(resolved: &ResolvedConfig, root: &Path, name: &str, id: &str) {
    let frames = root.join(format!("frames-{id}"));
    fs::create_dir_all(&frames).unwrap();
    for index in 0..2u32 {
        let frame = GrayImage::from_fn(16, 16, |x, y| image::Luma([(x * 16 + y + index) as u8]));
        frame.save(frames.join(format!("{index}.png"))).unwrap();
    }
    let args = EnrollArgs {
        name: name.into(),
        id: id.into(),
        force: false,
        frames,
    };
    enroll_with_config(&args, resolved).unwrap();
}

#[test]
fn users_handler_renders_outcome() {
    let rendered = Arc::new(Mutex::new(Vec::new()));
    let handler = UsersHandler::with_dependencies(
        UsersCommands::List,
        StoreArgs::default(),
        |_command, _store| Ok(UsersOutcome::List { users: vec![] }),
        {
            let rendered = Arc::clone(&rendered);
            move |outcome, mode| {
                rendered.lock().unwrap().push((outcome.clone(), mode));
                Ok(())
            }
        },
    );

    assert_eq!(
        handler.execute(OutputMode::Json, false).unwrap(),
        ExitCode::SUCCESS
    );
    let rendered = rendered.lock().unwrap();
    assert_eq!(
        rendered[0],
        (UsersOutcome::List { users: vec![] }, OutputMode::Json)
    );
}

#[test]
fn list_and_search_follow_enrollment_order() {
    let tmp = TempDir::new().unwrap();
    let resolved = setup(&tmp);

    match users_with_config(&UsersCommands::List, &resolved).unwrap() {
        UsersOutcome::List { users } => {
            let ids: Vec<_> = users.iter().map(|user| user.id.as_str()).collect();
            assert_eq!(ids, vec![ALICE, BOB]);
            assert_eq!((users[0].left_images, users[0].right_images), (1, 1));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let search = UsersCommands::Search(UserSearchArgs {
        query: "ZHANG".into(),
    });
    match users_with_config(&search, &resolved).unwrap() {
        UsersOutcome::Search { users, .. } => {
            assert_eq!(users.len(), 1);
            assert_eq!(users[0].name, "Alice Zhang");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let by_id = UsersCommands::Search(UserSearchArgs {
        query: "2002x".into(),
    });
    match users_with_config(&by_id, &resolved).unwrap() {
        UsersOutcome::Search { users, .. } => assert_eq!(users[0].id, BOB),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn images_lists_both_hands() {
    let tmp = TempDir::new().unwrap();
    let resolved = setup(&tmp);

    let command = UsersCommands::Images(UserIdArgs {
        id: "11010119920202002x".into(),
    });
    match users_with_config(&command, &resolved).unwrap() {
        UsersOutcome::Images { id, images } => {
            assert_eq!(id, BOB);
            assert_eq!(images.len(), 2);
            assert_eq!(images[0].hand, Hand::Left);
            assert_eq!(images[1].hand, Hand::Right);
            assert!(images.iter().all(|image| image.path.is_file()));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn delete_cascades_to_images() {
    let tmp = TempDir::new().unwrap();
    let resolved = setup(&tmp);

    let delete = UsersCommands::Delete(UserIdArgs { id: ALICE.into() });
    match users_with_config(&delete, &resolved).unwrap() {
        UsersOutcome::Delete {
            user,
            images_removed,
            images_failed,
            ..
        } => {
            assert_eq!(user.id, ALICE);
            assert_eq!(images_removed, 2);
            assert_eq!(images_failed, 0);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(!tmp
        .path()
        .join("local_images")
        .join(format!("{ALICE}_left_1.png"))
        .exists());

    let err = users_with_config(&delete, &resolved).unwrap_err();
    assert!(matches!(err, AppError::UserNotFound { .. }));
}
