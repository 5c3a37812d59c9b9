use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleField {
    Time,
    Title,
    Talker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldVisibility {
    pub header: bool,
    pub time: bool,
    pub title: bool,
    pub talker: bool,
}

impl FieldVisibility {
    pub const ALL: Self = Self {
        header: true,
        time: true,
        title: true,
        talker: true,
    };

    #[must_use]
    pub const fn shows(&self, field: ScheduleField) -> bool {
        match field {
            ScheduleField::Time => self.time,
            ScheduleField::Title => self.title,
            ScheduleField::Talker => self.talker,
        }
    }
}

/// Which schedule inputs fit above the keyboard.
///
/// With the keyboard up only two inputs fit and the header is hidden. The
/// focused input always stays visible together with one neighbour. From
/// the middle field the neighbour is the time input while it is still
/// empty, otherwise the talker input.
#[must_use]
pub const fn visible_fields(
    keyboard_visible: bool,
    focused: Option<ScheduleField>,
    time_filled: bool,
) -> FieldVisibility {
    if !keyboard_visible {
        return FieldVisibility::ALL;
    }
    let (time, talker) = match focused {
        None => (true, true),
        Some(ScheduleField::Time) => (true, false),
        Some(ScheduleField::Talker) => (false, true),
        Some(ScheduleField::Title) => (!time_filled, time_filled),
    };
    FieldVisibility {
        header: false,
        time,
        title: true,
        talker,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FocusState {
    keyboard_visible: bool,
    focused: Option<ScheduleField>,
}

impl FocusState {
    pub fn focus(&mut self, field: ScheduleField) {
        self.focused = Some(field);
    }

    pub fn keyboard_shown(&mut self) {
        self.keyboard_visible = true;
    }

    /// Hiding the keyboard restores every field but remembers the focus,
    /// so the same layout comes back when it reappears.
    pub fn keyboard_hidden(&mut self) {
        self.keyboard_visible = false;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub const fn focused(&self) -> Option<ScheduleField> {
        self.focused
    }

    #[must_use]
    pub const fn visibility(&self, time_filled: bool) -> FieldVisibility {
        visible_fields(self.keyboard_visible, self.focused, time_filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_keyboard_shows_everything() {
        for focused in [None, Some(ScheduleField::Time), Some(ScheduleField::Talker)] {
            assert_eq!(visible_fields(false, focused, true), FieldVisibility::ALL);
        }
    }

    #[test]
    fn focused_field_is_always_visible() {
        for field in [ScheduleField::Time, ScheduleField::Title, ScheduleField::Talker] {
            for time_filled in [false, true] {
                let v = visible_fields(true, Some(field), time_filled);
                assert!(v.shows(field));
                assert!(!v.header);
                let shown = [v.time, v.title, v.talker].iter().filter(|s| **s).count();
                assert_eq!(shown, 2, "{field:?} filled={time_filled}");
            }
        }
    }

    #[test]
    fn title_neighbour_depends_on_time() {
        let empty = visible_fields(true, Some(ScheduleField::Title), false);
        assert!(empty.time && !empty.talker);
        let filled = visible_fields(true, Some(ScheduleField::Title), true);
        assert!(!filled.time && filled.talker);
    }

    #[test]
    fn refocus_after_keyboard_cycle_restores_layout() {
        let mut state = FocusState::default();
        state.focus(ScheduleField::Talker);
        state.keyboard_shown();
        let collapsed = state.visibility(true);
        state.keyboard_hidden();
        assert_eq!(state.visibility(true), FieldVisibility::ALL);
        state.keyboard_shown();
        assert_eq!(state.visibility(true), collapsed);
        assert_eq!(state.focused(), Some(ScheduleField::Talker));
    }
}
