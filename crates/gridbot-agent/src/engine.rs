// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation state machine.
//!
//! [`ConversationEngine::handle`] authorizes the sender, locks their state,
//! runs the handler for the current step and commits the next state only when
//! the handler succeeds. Validation and not-found conditions become replies;
//! anything else is returned as an error for the dispatcher to report.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gridbot_core::{
    EventPayload, FavouritesStore, GridbotError, InboundEvent, Keyboard, NewFavourite, Reply,
    UserId,
};
use gridbot_sheets::{CellRef, SheetError, SheetResolver, display_name};
use tracing::{debug, info, warn};

use crate::keyboards::{self, ButtonAction};
use crate::messages;
use crate::state::{ConversationState, StateStore, step_name};

/// What a handler wants done with the user's state.
#[derive(Debug)]
enum Next {
    Keep,
    Set(ConversationState),
    Clear,
}

#[derive(Debug)]
struct Outcome {
    replies: Vec<Reply>,
    next: Next,
}

impl Outcome {
    fn keep(replies: Vec<Reply>) -> Self {
        Self {
            replies,
            next: Next::Keep,
        }
    }

    fn set(state: ConversationState, replies: Vec<Reply>) -> Self {
        Self {
            replies,
            next: Next::Set(state),
        }
    }

    fn clear(replies: Vec<Reply>) -> Self {
        Self {
            replies,
            next: Next::Clear,
        }
    }
}

/// Whether a step reply replaces the pressed keyboard message or is sent fresh.
#[derive(Debug, Clone, Copy)]
enum Surface {
    Pressed,
    Fresh,
}

impl Surface {
    fn reply(self, text: impl Into<String>, keyboard: Option<Keyboard>) -> Reply {
        match self {
            Surface::Pressed => Reply::edit(text, keyboard),
            Surface::Fresh => Reply::send(text, keyboard),
        }
    }
}

/// Key under which a file path is stored in favourites.
fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Drives every user's navigation through files, sheets, cells and favourites.
pub struct ConversationEngine {
    resolver: SheetResolver,
    favourites: Arc<dyn FavouritesStore>,
    states: StateStore,
    allowed_users: HashSet<UserId>,
}

impl ConversationEngine {
    /// An empty `allowed_users` admits nobody.
    pub fn new(
        resolver: SheetResolver,
        favourites: Arc<dyn FavouritesStore>,
        allowed_users: impl IntoIterator<Item = UserId>,
    ) -> Self {
        Self {
            resolver,
            favourites,
            states: StateStore::new(),
            allowed_users: allowed_users.into_iter().collect(),
        }
    }

    pub fn states(&self) -> &StateStore {
        &self.states
    }

    pub fn favourites(&self) -> &Arc<dyn FavouritesStore> {
        &self.favourites
    }

    pub fn resolver(&self) -> &SheetResolver {
        &self.resolver
    }

    pub fn is_authorized(&self, user: UserId) -> bool {
        self.allowed_users.contains(&user)
    }

    /// Handles one inbound event and returns the replies to deliver, in order.
    ///
    /// Every authorized button press is acknowledged first. On error the
    /// user's state is left as it was.
    pub async fn handle(&self, event: &InboundEvent) -> Result<Vec<Reply>, GridbotError> {
        let user = event.sender;
        let pressed = matches!(event.payload, EventPayload::Button(_));

        if !self.is_authorized(user) {
            debug!(user_id = %user, "rejected sender outside the allow-list");
            let rejection = if pressed {
                Reply::Answer {
                    text: Some(messages::NOT_AUTHORIZED_ALERT.to_string()),
                    alert: true,
                }
            } else {
                Reply::send(messages::NOT_AUTHORIZED, None)
            };
            return Ok(vec![rejection]);
        }

        let mut state = self.states.lock(user).await;
        let from = step_name(state.as_ref());

        let outcome = match &event.payload {
            EventPayload::Command(name) => self.on_command(user, name).await?,
            EventPayload::Text(text) => self.on_text(user, state.as_ref(), text).await?,
            EventPayload::Button(payload) => self.on_button(user, state.as_ref(), payload).await?,
        };

        match outcome.next {
            Next::Keep => {}
            Next::Set(next) => *state = Some(next),
            Next::Clear => *state = None,
        }
        debug!(user_id = %user, from, to = step_name(state.as_ref()), "transition");

        let mut replies = Vec::with_capacity(outcome.replies.len() + 1);
        if pressed {
            replies.push(Reply::Answer {
                text: None,
                alert: false,
            });
        }
        replies.extend(outcome.replies);
        Ok(replies)
    }

    async fn on_command(&self, user: UserId, name: &str) -> Result<Outcome, GridbotError> {
        match name {
            "start" => {
                let menu = self.main_menu(user, Surface::Fresh).await?;
                Ok(Outcome::set(ConversationState::MainMenu, vec![menu]))
            }
            "exit" => Ok(exit(Surface::Fresh)),
            other => {
                debug!(user_id = %user, command = other, "unknown command");
                Ok(Outcome::keep(vec![Reply::send(
                    messages::UNKNOWN_COMMAND,
                    None,
                )]))
            }
        }
    }

    async fn on_text(
        &self,
        user: UserId,
        state: Option<&ConversationState>,
        text: &str,
    ) -> Result<Outcome, GridbotError> {
        if text.trim().eq_ignore_ascii_case("/exit") {
            return Ok(exit(Surface::Fresh));
        }

        match state {
            Some(ConversationState::ChoosingCell { file, sheet }) => {
                self.read_cell(user, file, sheet, text).await
            }
            Some(ConversationState::AskingNickname { file, sheet, cell }) => {
                self.save_favourite(user, file, sheet, cell, text).await
            }
            // No state, or a step that expects a button: back to the menu.
            _ => {
                let menu = self.main_menu(user, Surface::Fresh).await?;
                Ok(Outcome::set(ConversationState::MainMenu, vec![menu]))
            }
        }
    }

    async fn on_button(
        &self,
        user: UserId,
        state: Option<&ConversationState>,
        payload: &str,
    ) -> Result<Outcome, GridbotError> {
        match ButtonAction::parse(payload) {
            ButtonAction::Exit => Ok(exit(Surface::Pressed)),
            ButtonAction::MenuFiles => self.show_files().await,
            ButtonAction::MenuFavourites => self.show_favourites(user).await,
            ButtonAction::File(index) => self.choose_file(user, state, index).await,
            ButtonAction::Sheet(index) => Ok(choose_sheet(state, index)),
            ButtonAction::Favourite(id) => self.open_favourite(user, id).await,
            ButtonAction::Unknown => {
                debug!(user_id = %user, payload, "unroutable button payload");
                Ok(Outcome::keep(vec![Reply::edit(
                    messages::UNKNOWN_ACTION,
                    Some(keyboards::exit_only()),
                )]))
            }
        }
    }

    async fn main_menu(&self, user: UserId, surface: Surface) -> Result<Reply, GridbotError> {
        let has_favourites = !self.favourites.list_by_user(user).await?.is_empty();
        Ok(surface.reply(
            messages::MENU_PROMPT,
            Some(keyboards::main_menu(has_favourites)),
        ))
    }

    async fn show_files(&self) -> Result<Outcome, GridbotError> {
        let files = self.resolver.list_files().await?;
        if files.is_empty() {
            return Ok(Outcome::set(
                ConversationState::MainMenu,
                vec![Reply::edit(
                    messages::NO_FILES,
                    Some(keyboards::exit_only()),
                )],
            ));
        }

        let keyboard =
            keyboards::indexed_list(keyboards::FILE_PREFIX, files.iter().map(|f| display_name(f)));
        Ok(Outcome::set(
            ConversationState::ChoosingFile { files },
            vec![Reply::edit(messages::SELECT_FILE, Some(keyboard))],
        ))
    }

    async fn show_favourites(&self, user: UserId) -> Result<Outcome, GridbotError> {
        let favourites = self.favourites.list_by_user(user).await?;
        if favourites.is_empty() {
            return Ok(Outcome::set(
                ConversationState::MainMenu,
                vec![Reply::edit(
                    messages::NO_FAVOURITES,
                    Some(keyboards::main_menu(false)),
                )],
            ));
        }
        Ok(Outcome::set(
            ConversationState::ChoosingFavourite,
            vec![Reply::edit(
                messages::SELECT_FAVOURITE,
                Some(keyboards::favourites(&favourites)),
            )],
        ))
    }

    async fn choose_file(
        &self,
        user: UserId,
        state: Option<&ConversationState>,
        index: Option<usize>,
    ) -> Result<Outcome, GridbotError> {
        let chosen = match (state, index) {
            (Some(ConversationState::ChoosingFile { files }), Some(i)) => files.get(i),
            _ => None,
        };
        let Some(file) = chosen.cloned() else {
            return Ok(invalid(messages::INVALID_FILE));
        };

        let sheets = match self.resolver.list_sheets(&file).await {
            Ok(sheets) => sheets,
            Err(e) => return self.unavailable(user, e, Surface::Pressed).await,
        };
        debug!(user_id = %user, file = %file.display(), sheets = sheets.len(), "file chosen");

        let keyboard =
            keyboards::indexed_list(keyboards::SHEET_PREFIX, sheets.iter().map(String::as_str));
        let prompt = messages::select_sheet(&display_name(&file));
        Ok(Outcome::set(
            ConversationState::ChoosingSheet { file, sheets },
            vec![Reply::edit(prompt, Some(keyboard))],
        ))
    }

    async fn read_cell(
        &self,
        user: UserId,
        file: &Path,
        sheet: &str,
        text: &str,
    ) -> Result<Outcome, GridbotError> {
        let Ok(cell) = text.trim().parse::<CellRef>() else {
            return Ok(Outcome::keep(vec![Reply::send(
                messages::INVALID_CELL,
                Some(keyboards::exit_only()),
            )]));
        };

        let value = match self.resolver.read_cell(file, sheet, &cell).await {
            Ok(value) => value,
            Err(e) => return self.unavailable(user, e, Surface::Fresh).await,
        };
        debug!(user_id = %user, file = %file.display(), sheet, cell = %cell, "cell read");

        let mut replies = vec![Reply::send(
            messages::cell_value(sheet, cell, &value),
            None,
        )];
        let saved = self
            .favourites
            .exists_for(user, &path_key(file), sheet, &cell.to_string())
            .await?;
        if saved {
            replies.push(self.main_menu(user, Surface::Fresh).await?);
            return Ok(Outcome::set(ConversationState::MainMenu, replies));
        }

        replies.push(Reply::send(
            messages::SAVE_PROMPT,
            Some(keyboards::exit_only()),
        ));
        Ok(Outcome::set(
            ConversationState::AskingNickname {
                file: file.to_path_buf(),
                sheet: sheet.to_string(),
                cell,
            },
            replies,
        ))
    }

    async fn save_favourite(
        &self,
        user: UserId,
        file: &Path,
        sheet: &str,
        cell: &CellRef,
        text: &str,
    ) -> Result<Outcome, GridbotError> {
        let nickname = text.trim();
        if nickname.is_empty() {
            return Ok(Outcome::keep(vec![Reply::send(
                messages::SAVE_PROMPT,
                Some(keyboards::exit_only()),
            )]));
        }

        let id = self
            .favourites
            .insert(&NewFavourite {
                user_id: user,
                nickname: nickname.to_string(),
                file_path: path_key(file),
                sheet_name: sheet.to_string(),
                cell: cell.to_string(),
            })
            .await?;
        info!(user_id = %user, favourite_id = id, nickname, "favourite saved");

        let menu = self.main_menu(user, Surface::Fresh).await?;
        Ok(Outcome::set(
            ConversationState::MainMenu,
            vec![Reply::send(messages::favourite_saved(nickname), None), menu],
        ))
    }

    async fn open_favourite(&self, user: UserId, id: Option<i64>) -> Result<Outcome, GridbotError> {
        let Some(id) = id else {
            return Ok(invalid(messages::INVALID_FAVOURITE));
        };
        // Other users' favourites are indistinguishable from missing ones.
        let found = self
            .favourites
            .get_by_id(id)
            .await?
            .filter(|f| f.user_id == user);
        let Some(favourite) = found else {
            return Ok(invalid(messages::FAVOURITE_NOT_FOUND));
        };

        let cell: CellRef = favourite.cell.parse()?;
        let file = PathBuf::from(&favourite.file_path);
        let value = match self
            .resolver
            .read_cell(&file, &favourite.sheet_name, &cell)
            .await
        {
            Ok(value) => value,
            Err(e) => return self.unavailable(user, e, Surface::Pressed).await,
        };
        debug!(user_id = %user, favourite_id = id, "favourite read");

        let menu = self.main_menu(user, Surface::Fresh).await?;
        Ok(Outcome::set(
            ConversationState::MainMenu,
            vec![
                Reply::edit(
                    messages::favourite_value(&favourite.nickname, &favourite.sheet_name, cell, &value),
                    None,
                ),
                menu,
            ],
        ))
    }

    /// Reports a vanished file or sheet and returns to the menu. Other
    /// resolver failures propagate.
    async fn unavailable(
        &self,
        user: UserId,
        err: SheetError,
        surface: Surface,
    ) -> Result<Outcome, GridbotError> {
        if !err.is_not_found() {
            return Err(err.into());
        }
        warn!(user_id = %user, error = %err, "spreadsheet no longer available");
        let menu = self.main_menu(user, Surface::Fresh).await?;
        Ok(Outcome::set(
            ConversationState::MainMenu,
            vec![surface.reply(messages::unavailable(&err), None), menu],
        ))
    }
}

fn exit(surface: Surface) -> Outcome {
    Outcome::clear(vec![surface.reply(messages::EXITED, None)])
}

/// A rejected selection: the pressed message explains, state is untouched.
fn invalid(text: &str) -> Outcome {
    Outcome::keep(vec![Reply::edit(text, Some(keyboards::exit_only()))])
}

fn choose_sheet(state: Option<&ConversationState>, index: Option<usize>) -> Outcome {
    let chosen = match (state, index) {
        (Some(ConversationState::ChoosingSheet { file, sheets }), Some(i)) => {
            sheets.get(i).map(|sheet| (file.clone(), sheet.clone()))
        }
        _ => None,
    };
    let Some((file, sheet)) = chosen else {
        return invalid(messages::INVALID_SHEET);
    };
    Outcome::set(
        ConversationState::ChoosingCell { file, sheet },
        vec![Reply::edit(
            messages::ENTER_CELL,
            Some(keyboards::exit_only()),
        )],
    )
}
