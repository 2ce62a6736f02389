// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation flows driven straight through the engine.

use gridbot_agent::ConversationState;
use gridbot_agent::messages;
use gridbot_core::{Reply, UserId};
use gridbot_test_utils::{TestHarness, XlsxBuilder};

const ALICE: i64 = 111;
const BOB: i64 = 222;
const MALLORY: i64 = 999;

fn budget() -> XlsxBuilder {
    XlsxBuilder::new()
        .sheet("Summary")
        .number("C3", 1234.5)
        .text("A1", "Revenue")
        .formula("D4", "C3*2")
        .sheet("Detail")
        .number("A1", 7.0)
}

async fn harness() -> TestHarness {
    TestHarness::builder()
        .with_user(ALICE)
        .with_user(BOB)
        .with_workbook("Budget.xlsx", budget())
        .with_workbook("costs.xlsx", XlsxBuilder::new().number("A1", 1.0))
        .with_workbook("Forecast.xlsx", XlsxBuilder::new().number("A1", 2.0))
        .with_file("notes.txt", "not a spreadsheet")
        .build()
        .await
        .unwrap()
}

fn texts(replies: &[Reply]) -> Vec<&str> {
    replies.iter().filter_map(Reply::text).collect()
}

fn last_keyboard(replies: &[Reply]) -> Vec<&str> {
    replies
        .iter()
        .rev()
        .find_map(Reply::keyboard)
        .map(|kb| kb.payloads())
        .unwrap_or_default()
}

/// Walks `user` to ChoosingCell on Budget.xlsx / Summary.
async fn to_choosing_cell(h: &TestHarness, user: i64) {
    h.command(user, "start").await.unwrap();
    h.press(user, "menu:files").await.unwrap();
    h.press(user, "file:0").await.unwrap();
    h.press(user, "sheet:0").await.unwrap();
    assert!(matches!(
        h.state(user).await,
        Some(ConversationState::ChoosingCell { .. })
    ));
}

#[tokio::test]
async fn start_shows_main_menu() {
    let h = harness().await;
    let replies = h.command(ALICE, "start").await.unwrap();

    assert_eq!(texts(&replies), vec![messages::MENU_PROMPT]);
    assert!(matches!(replies[0], Reply::Send { .. }));
    assert_eq!(last_keyboard(&replies), vec!["menu:files", "exit"]);
    assert_eq!(h.state(ALICE).await, Some(ConversationState::MainMenu));
}

#[tokio::test]
async fn text_without_state_is_an_implicit_start() {
    let h = harness().await;
    let replies = h.text(ALICE, "hello?").await.unwrap();
    assert_eq!(texts(&replies), vec![messages::MENU_PROMPT]);
    assert_eq!(h.state(ALICE).await, Some(ConversationState::MainMenu));
}

#[tokio::test]
async fn unauthorized_senders_are_rejected_without_state() {
    let h = harness().await;

    let replies = h.text(MALLORY, "hi").await.unwrap();
    assert_eq!(texts(&replies), vec![messages::NOT_AUTHORIZED]);

    let replies = h.press(MALLORY, "menu:files").await.unwrap();
    assert_eq!(
        replies,
        vec![Reply::Answer {
            text: Some(messages::NOT_AUTHORIZED_ALERT.to_string()),
            alert: true
        }]
    );

    h.command(MALLORY, "start").await.unwrap();
    assert_eq!(h.state(MALLORY).await, None);
}

#[tokio::test]
async fn empty_allow_list_admits_nobody() {
    let h = TestHarness::builder().build().await.unwrap();
    let replies = h.command(ALICE, "start").await.unwrap();
    assert_eq!(texts(&replies), vec![messages::NOT_AUTHORIZED]);
    assert_eq!(h.state(ALICE).await, None);
}

#[tokio::test]
async fn full_happy_path_then_repeat_skips_nickname() {
    let h = harness().await;

    h.command(ALICE, "start").await.unwrap();

    let replies = h.press(ALICE, "menu:files").await.unwrap();
    assert_eq!(
        replies[0],
        Reply::Answer {
            text: None,
            alert: false
        }
    );
    assert!(matches!(replies[1], Reply::Edit { .. }));
    assert_eq!(texts(&replies), vec![messages::SELECT_FILE]);
    assert_eq!(
        last_keyboard(&replies),
        vec!["file:0", "file:1", "file:2", "exit"]
    );
    let labels: Vec<_> = replies[1]
        .keyboard()
        .unwrap()
        .rows
        .iter()
        .map(|row| row[0].label.as_str())
        .collect();
    assert_eq!(labels, vec!["Budget.xlsx", "costs.xlsx", "Forecast.xlsx", "❌ Exit"]);

    let replies = h.press(ALICE, "file:0").await.unwrap();
    assert_eq!(texts(&replies), vec!["Select a sheet from Budget.xlsx:"]);
    assert_eq!(last_keyboard(&replies), vec!["sheet:0", "sheet:1", "exit"]);
    assert!(matches!(
        h.state(ALICE).await,
        Some(ConversationState::ChoosingSheet { ref sheets, .. }) if sheets == &["Summary", "Detail"]
    ));

    let replies = h.press(ALICE, "sheet:0").await.unwrap();
    assert_eq!(texts(&replies), vec![messages::ENTER_CELL]);
    assert_eq!(last_keyboard(&replies), vec!["exit"]);

    let replies = h.text(ALICE, "c3").await.unwrap();
    assert_eq!(
        texts(&replies),
        vec!["Value in Summary!C3: R1,234.50", messages::SAVE_PROMPT]
    );
    assert!(matches!(
        h.state(ALICE).await,
        Some(ConversationState::AskingNickname { ref sheet, cell, .. })
            if sheet == "Summary" && cell.to_string() == "C3"
    ));

    let replies = h.text(ALICE, "  Revenue ").await.unwrap();
    assert_eq!(
        texts(&replies),
        vec!["Favourite “Revenue” saved ✅", messages::MENU_PROMPT]
    );
    assert_eq!(
        last_keyboard(&replies),
        vec!["menu:files", "menu:favs", "exit"]
    );
    assert_eq!(h.state(ALICE).await, Some(ConversationState::MainMenu));

    let saved = h.favourites.list_by_user(UserId(ALICE)).await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].nickname, "Revenue");
    assert_eq!(saved[0].sheet_name, "Summary");
    assert_eq!(saved[0].cell, "C3");
    assert!(saved[0].file_path.ends_with("Budget.xlsx"));

    // Same lookup again: no nickname prompt.
    to_choosing_cell(&h, ALICE).await;
    let replies = h.text(ALICE, "C3").await.unwrap();
    assert_eq!(
        texts(&replies),
        vec!["Value in Summary!C3: R1,234.50", messages::MENU_PROMPT]
    );
    assert_eq!(h.state(ALICE).await, Some(ConversationState::MainMenu));
    assert_eq!(h.favourites.list_by_user(UserId(ALICE)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn uncached_formula_is_evaluated_for_the_user() {
    let h = harness().await;
    to_choosing_cell(&h, ALICE).await;
    let replies = h.text(ALICE, "D4").await.unwrap();
    assert_eq!(texts(&replies)[0], "Value in Summary!D4: R2,469.00");
}

#[tokio::test]
async fn out_of_range_file_index_keeps_state() {
    let h = harness().await;
    h.command(ALICE, "start").await.unwrap();
    h.press(ALICE, "menu:files").await.unwrap();
    let before = h.state(ALICE).await;
    assert!(matches!(
        before,
        Some(ConversationState::ChoosingFile { ref files }) if files.len() == 3
    ));

    for payload in ["file:5", "file:x", "file:-1"] {
        let replies = h.press(ALICE, payload).await.unwrap();
        assert_eq!(texts(&replies), vec![messages::INVALID_FILE], "{payload}");
        assert_eq!(last_keyboard(&replies), vec!["exit"]);
        assert_eq!(h.state(ALICE).await, before, "{payload}");
    }
}

#[tokio::test]
async fn stale_selection_buttons_are_invalid() {
    let h = harness().await;
    h.command(ALICE, "start").await.unwrap();

    let replies = h.press(ALICE, "sheet:0").await.unwrap();
    assert_eq!(texts(&replies), vec![messages::INVALID_SHEET]);
    let replies = h.press(ALICE, "file:0").await.unwrap();
    assert_eq!(texts(&replies), vec![messages::INVALID_FILE]);
    assert_eq!(h.state(ALICE).await, Some(ConversationState::MainMenu));
}

#[tokio::test]
async fn invalid_cell_keeps_asking() {
    let h = harness().await;
    to_choosing_cell(&h, ALICE).await;

    for input in ["3C", "C", "A0", "C3 D4", "XFE1"] {
        let replies = h.text(ALICE, input).await.unwrap();
        assert_eq!(texts(&replies), vec![messages::INVALID_CELL], "{input}");
        assert!(matches!(
            h.state(ALICE).await,
            Some(ConversationState::ChoosingCell { .. })
        ));
    }
}

#[tokio::test]
async fn exit_typed_as_text_clears_state() {
    let h = harness().await;
    to_choosing_cell(&h, ALICE).await;

    let replies = h.text(ALICE, " /EXIT ").await.unwrap();
    assert_eq!(texts(&replies), vec![messages::EXITED]);
    assert!(matches!(replies[0], Reply::Send { keyboard: None, .. }));
    assert_eq!(h.state(ALICE).await, None);
}

#[tokio::test]
async fn exit_button_and_command_clear_state() {
    let h = harness().await;
    to_choosing_cell(&h, ALICE).await;

    let replies = h.press(ALICE, "exit").await.unwrap();
    assert!(matches!(replies[1], Reply::Edit { keyboard: None, .. }));
    assert_eq!(texts(&replies), vec![messages::EXITED]);
    assert_eq!(h.state(ALICE).await, None);

    h.command(ALICE, "start").await.unwrap();
    h.command(ALICE, "exit").await.unwrap();
    assert_eq!(h.state(ALICE).await, None);
}

#[tokio::test]
async fn exit_during_nickname_prompt_saves_nothing() {
    let h = harness().await;
    to_choosing_cell(&h, ALICE).await;
    h.text(ALICE, "C3").await.unwrap();
    h.press(ALICE, "exit").await.unwrap();
    assert!(h.favourites.list_by_user(UserId(ALICE)).await.unwrap().is_empty());
}

#[tokio::test]
async fn blank_nickname_reprompts() {
    let h = harness().await;
    to_choosing_cell(&h, ALICE).await;
    h.text(ALICE, "C3").await.unwrap();

    let replies = h.text(ALICE, "   ").await.unwrap();
    assert_eq!(texts(&replies), vec![messages::SAVE_PROMPT]);
    assert!(matches!(
        h.state(ALICE).await,
        Some(ConversationState::AskingNickname { .. })
    ));
}

#[tokio::test]
async fn favourites_menu_when_empty() {
    let h = harness().await;
    h.command(ALICE, "start").await.unwrap();
    let replies = h.press(ALICE, "menu:favs").await.unwrap();
    assert_eq!(texts(&replies), vec![messages::NO_FAVOURITES]);
    assert_eq!(last_keyboard(&replies), vec!["menu:files", "exit"]);
    assert_eq!(h.state(ALICE).await, Some(ConversationState::MainMenu));
}

#[tokio::test]
async fn favourite_lookup_reads_the_saved_cell() {
    let h = harness().await;
    to_choosing_cell(&h, ALICE).await;
    h.text(ALICE, "C3").await.unwrap();
    h.text(ALICE, "Revenue").await.unwrap();
    let id = h.favourites.list_by_user(UserId(ALICE)).await.unwrap()[0].id;

    let payload = format!("fav:{id}");

    let replies = h.press(ALICE, "menu:favs").await.unwrap();
    assert_eq!(texts(&replies), vec![messages::SELECT_FAVOURITE]);
    assert_eq!(last_keyboard(&replies), vec![payload.as_str(), "exit"]);
    assert_eq!(h.state(ALICE).await, Some(ConversationState::ChoosingFavourite));

    let replies = h.press(ALICE, &payload).await.unwrap();
    assert_eq!(
        texts(&replies),
        vec!["Value for Revenue (Summary!C3): R1,234.50", messages::MENU_PROMPT]
    );
    assert!(matches!(replies[1], Reply::Edit { .. }));
    assert!(matches!(replies[2], Reply::Send { .. }));
    assert_eq!(h.state(ALICE).await, Some(ConversationState::MainMenu));
}

#[tokio::test]
async fn favourites_of_other_users_are_not_found() {
    let h = harness().await;
    to_choosing_cell(&h, ALICE).await;
    h.text(ALICE, "C3").await.unwrap();
    h.text(ALICE, "Mine").await.unwrap();
    let id = h.favourites.list_by_user(UserId(ALICE)).await.unwrap()[0].id;

    h.command(BOB, "start").await.unwrap();
    let replies = h.press(BOB, &format!("fav:{id}")).await.unwrap();
    assert_eq!(texts(&replies), vec![messages::FAVOURITE_NOT_FOUND]);

    let replies = h.press(BOB, "fav:abc").await.unwrap();
    assert_eq!(texts(&replies), vec![messages::INVALID_FAVOURITE]);
    assert_eq!(h.state(BOB).await, Some(ConversationState::MainMenu));

    // Bob's own lookup of the same cell still asks for a nickname.
    to_choosing_cell(&h, BOB).await;
    let replies = h.text(BOB, "C3").await.unwrap();
    assert_eq!(texts(&replies)[1], messages::SAVE_PROMPT);
}

#[tokio::test]
async fn unknown_button_and_command_change_nothing() {
    let h = harness().await;
    h.command(ALICE, "start").await.unwrap();

    let replies = h.press(ALICE, "menu:settings").await.unwrap();
    assert_eq!(texts(&replies), vec![messages::UNKNOWN_ACTION]);
    assert_eq!(last_keyboard(&replies), vec!["exit"]);

    let replies = h.command(ALICE, "help").await.unwrap();
    assert_eq!(texts(&replies), vec![messages::UNKNOWN_COMMAND]);
    assert_eq!(h.state(ALICE).await, Some(ConversationState::MainMenu));
}

#[tokio::test]
async fn empty_folder_stays_on_main_menu() {
    let h = TestHarness::builder()
        .with_user(ALICE)
        .with_file("~$lock.xlsx", "lock")
        .build()
        .await
        .unwrap();
    h.command(ALICE, "start").await.unwrap();

    let replies = h.press(ALICE, "menu:files").await.unwrap();
    assert_eq!(texts(&replies), vec![messages::NO_FILES]);
    assert_eq!(last_keyboard(&replies), vec!["exit"]);
    assert_eq!(h.state(ALICE).await, Some(ConversationState::MainMenu));
}

#[tokio::test]
async fn vanished_file_returns_to_menu() {
    let h = harness().await;
    h.command(ALICE, "start").await.unwrap();
    h.press(ALICE, "menu:files").await.unwrap();
    std::fs::remove_file(h.folder().join("Budget.xlsx")).unwrap();

    let replies = h.press(ALICE, "file:0").await.unwrap();
    let shown = texts(&replies);
    assert!(
        shown[0].starts_with("That spreadsheet is no longer available:"),
        "{shown:?}"
    );
    assert_eq!(shown[1], messages::MENU_PROMPT);
    assert_eq!(h.state(ALICE).await, Some(ConversationState::MainMenu));
}

#[tokio::test]
async fn renamed_sheet_returns_to_menu() {
    let h = harness().await;
    to_choosing_cell(&h, ALICE).await;
    budget_without_summary(&h);

    let replies = h.text(ALICE, "C3").await.unwrap();
    assert!(texts(&replies)[0].contains("Summary"));
    assert_eq!(h.state(ALICE).await, Some(ConversationState::MainMenu));
}

fn budget_without_summary(h: &TestHarness) {
    XlsxBuilder::new()
        .sheet("Totals")
        .number("C3", 1.0)
        .write_in(h.folder(), "Budget.xlsx")
        .unwrap();
}

#[tokio::test]
async fn store_failure_is_an_error_and_keeps_state() {
    let h = harness().await;
    to_choosing_cell(&h, ALICE).await;
    h.memory.as_ref().unwrap().set_failing(true);

    assert!(h.text(ALICE, "C3").await.is_err());
    assert!(matches!(
        h.state(ALICE).await,
        Some(ConversationState::ChoosingCell { .. })
    ));

    h.memory.as_ref().unwrap().set_failing(false);
    let replies = h.text(ALICE, "C3").await.unwrap();
    assert_eq!(texts(&replies)[1], messages::SAVE_PROMPT);
}

#[tokio::test]
async fn users_navigate_independently() {
    let h = harness().await;
    to_choosing_cell(&h, ALICE).await;
    h.command(BOB, "start").await.unwrap();
    h.press(BOB, "menu:files").await.unwrap();

    h.text(ALICE, "C3").await.unwrap();
    assert!(matches!(
        h.state(BOB).await,
        Some(ConversationState::ChoosingFile { .. })
    ));
    assert!(matches!(
        h.state(ALICE).await,
        Some(ConversationState::AskingNickname { .. })
    ));
}

#[tokio::test]
async fn sqlite_store_backs_the_same_flow() {
    let h = TestHarness::builder()
        .with_user(ALICE)
        .with_workbook("Budget.xlsx", budget())
        .with_sqlite()
        .build()
        .await
        .unwrap();

    to_choosing_cell(&h, ALICE).await;
    h.text(ALICE, "C3").await.unwrap();
    h.text(ALICE, "Revenue").await.unwrap();

    to_choosing_cell(&h, ALICE).await;
    let replies = h.text(ALICE, "c3").await.unwrap();
    assert_eq!(texts(&replies)[1], messages::MENU_PROMPT);
}
