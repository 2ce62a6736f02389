// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inline keyboards and the button payload namespace.
//!
//! Payloads are part of the wire contract with existing chats: `exit`,
//! `menu:files`, `menu:favs`, `file:<index>`, `sheet:<index>`, `fav:<id>`.

use gridbot_core::{Favourite, Keyboard};

pub const EXIT: &str = "exit";
pub const MENU_FILES: &str = "menu:files";
pub const MENU_FAVOURITES: &str = "menu:favs";
pub const FILE_PREFIX: &str = "file";
pub const SHEET_PREFIX: &str = "sheet";
pub const FAVOURITE_PREFIX: &str = "fav";

pub const EXIT_LABEL: &str = "❌ Exit";
const FILES_LABEL: &str = "📂 Select from Excel files";
const FAVOURITES_LABEL: &str = "⭐ Select from favourites";

/// A decoded button payload.
///
/// Index and id fields are `None` when the suffix is not a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Exit,
    MenuFiles,
    MenuFavourites,
    File(Option<usize>),
    Sheet(Option<usize>),
    Favourite(Option<i64>),
    Unknown,
}

impl ButtonAction {
    pub fn parse(payload: &str) -> Self {
        match payload {
            EXIT => return ButtonAction::Exit,
            MENU_FILES => return ButtonAction::MenuFiles,
            MENU_FAVOURITES => return ButtonAction::MenuFavourites,
            _ => {}
        }
        let Some((prefix, arg)) = payload.split_once(':') else {
            return ButtonAction::Unknown;
        };
        match prefix {
            FILE_PREFIX => ButtonAction::File(arg.parse().ok()),
            SHEET_PREFIX => ButtonAction::Sheet(arg.parse().ok()),
            FAVOURITE_PREFIX => ButtonAction::Favourite(arg.parse().ok()),
            _ => ButtonAction::Unknown,
        }
    }
}

/// A keyboard holding only the Exit button.
pub fn exit_only() -> Keyboard {
    Keyboard::new().single(EXIT_LABEL, EXIT)
}

/// The main menu. The favourites entry only appears when there is something to pick.
pub fn main_menu(has_favourites: bool) -> Keyboard {
    let mut kb = Keyboard::new().single(FILES_LABEL, MENU_FILES);
    if has_favourites {
        kb = kb.single(FAVOURITES_LABEL, MENU_FAVOURITES);
    }
    kb.single(EXIT_LABEL, EXIT)
}

/// One button per row labelled with each entry, payload `<prefix>:<index>`.
pub fn indexed_list<I, S>(prefix: &str, labels: I) -> Keyboard
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    labels
        .into_iter()
        .enumerate()
        .fold(Keyboard::new(), |kb, (i, label)| {
            kb.single(label, format!("{prefix}:{i}"))
        })
        .single(EXIT_LABEL, EXIT)
}

/// One button per favourite, labelled by nickname and carrying the row id.
pub fn favourites(favs: &[Favourite]) -> Keyboard {
    favs.iter()
        .fold(Keyboard::new(), |kb, fav| {
            kb.single(
                fav.nickname.as_str(),
                format!("{FAVOURITE_PREFIX}:{}", fav.id),
            )
        })
        .single(EXIT_LABEL, EXIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridbot_core::UserId;

    #[test]
    fn parses_reserved_payloads() {
        assert_eq!(ButtonAction::parse("exit"), ButtonAction::Exit);
        assert_eq!(ButtonAction::parse("menu:files"), ButtonAction::MenuFiles);
        assert_eq!(ButtonAction::parse("menu:favs"), ButtonAction::MenuFavourites);
        assert_eq!(ButtonAction::parse("file:2"), ButtonAction::File(Some(2)));
        assert_eq!(ButtonAction::parse("sheet:0"), ButtonAction::Sheet(Some(0)));
        assert_eq!(ButtonAction::parse("fav:17"), ButtonAction::Favourite(Some(17)));
    }

    #[test]
    fn non_numeric_suffixes_keep_their_kind() {
        assert_eq!(ButtonAction::parse("file:x"), ButtonAction::File(None));
        assert_eq!(ButtonAction::parse("sheet:-1"), ButtonAction::Sheet(None));
        assert_eq!(ButtonAction::parse("fav:"), ButtonAction::Favourite(None));
    }

    #[test]
    fn unknown_payloads() {
        assert_eq!(ButtonAction::parse(""), ButtonAction::Unknown);
        assert_eq!(ButtonAction::parse("menu:other"), ButtonAction::Unknown);
        assert_eq!(ButtonAction::parse("EXIT"), ButtonAction::Unknown);
    }

    #[test]
    fn main_menu_hides_favourites_when_empty() {
        assert_eq!(main_menu(false).payloads(), vec!["menu:files", "exit"]);
        assert_eq!(
            main_menu(true).payloads(),
            vec!["menu:files", "menu:favs", "exit"]
        );
    }

    #[test]
    fn lists_end_with_a_lone_exit_row() {
        let kb = indexed_list(FILE_PREFIX, ["a.xlsx", "b.xls"]);
        assert_eq!(kb.payloads(), vec!["file:0", "file:1", "exit"]);
        assert_eq!(kb.rows[1][0].label, "b.xls");
        let last = kb.last_row().unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].label, EXIT_LABEL);
    }

    #[test]
    fn favourite_buttons_carry_ids() {
        let fav = Favourite {
            id: 42,
            user_id: UserId(1),
            nickname: "Revenue".into(),
            file_path: "/x.xlsx".into(),
            sheet_name: "S".into(),
            cell: "C3".into(),
        };
        let kb = favourites(&[fav]);
        assert_eq!(kb.payloads(), vec!["fav:42", "exit"]);
        assert_eq!(kb.rows[0][0].label, "Revenue");
    }
}
