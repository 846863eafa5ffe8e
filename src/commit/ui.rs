//! Interactive commit message selection.
//!
//! A single-threaded crossterm event loop with two modes:
//!
//! - **selection**: a scrollable list of provider candidates plus a
//!   "Write custom message" sentinel, with a footer of five toggles on
//!   keys `1..5` (dry run, push, and a mutually exclusive tag radio
//!   group).
//! - **manual**: a multi-line editor. Enter appends a newline, Ctrl+D
//!   submits once the trimmed input has at least three characters, Esc
//!   returns to selection.
//!
//! All state changes happen in [`Model::handle_key`]; rendering is a pure
//! function of the model, so the constraint system is testable without a
//! terminal. The terminal is restored on every exit path, panics included.

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute, terminal};
use std::collections::HashMap;
use std::io::{stdout, Write};

pub const CHECKBOX_DRY_RUN: &str = "dry_run";
pub const CHECKBOX_PUSH: &str = "push";
pub const CHECKBOX_TAG_MAJOR: &str = "create_tag_major";
pub const CHECKBOX_TAG_MINOR: &str = "create_tag_minor";
pub const CHECKBOX_TAG_PATCH: &str = "create_tag_patch";

const LIST_TITLE: &str = "Select Commit Message";
const MANUAL_OPTION_TITLE: &str = "Write custom message";
const MANUAL_INPUT_TITLE: &str = "Write Your Commit Message";
const MANUAL_INPUT_HELP: &str = "Enter: new line • Ctrl+D: finish • Esc: cancel";
const FOOTER_HELP: &str = "↑/↓ move • enter select • 1-5 toggle • q quit";
const PROVIDER_MANUAL: &str = "manual";

const CHECKED: &str = "▣";
const UNCHECKED: &str = "▢";
const CURSOR_BAR: &str = "│";

const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

const MIN_COMMIT_MESSAGE_LENGTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToggleKind {
    Checkbox,
    TagRadio,
}

struct Toggle {
    id: &'static str,
    key: char,
    label: &'static str,
    kind: ToggleKind,
}

/// The footer constraint table: ids, keymap, and exclusion class.
const TOGGLES: &[Toggle] = &[
    Toggle {
        id: CHECKBOX_DRY_RUN,
        key: '1',
        label: "Dry run",
        kind: ToggleKind::Checkbox,
    },
    Toggle {
        id: CHECKBOX_PUSH,
        key: '2',
        label: "Push to remote",
        kind: ToggleKind::Checkbox,
    },
    Toggle {
        id: CHECKBOX_TAG_MAJOR,
        key: '3',
        label: "Tag (major)",
        kind: ToggleKind::TagRadio,
    },
    Toggle {
        id: CHECKBOX_TAG_MINOR,
        key: '4',
        label: "Tag (minor)",
        kind: ToggleKind::TagRadio,
    },
    Toggle {
        id: CHECKBOX_TAG_PATCH,
        key: '5',
        label: "Tag (patch)",
        kind: ToggleKind::TagRadio,
    },
];

pub struct Model {
    items: Vec<(String, String)>,
    cursor: usize,
    manual_mode: bool,
    manual_input: String,
    checkboxes: HashMap<&'static str, bool>,
    final_choice: String,
    done: bool,
}

impl Model {
    pub fn new(suggestions: &HashMap<String, String>, initial: &HashMap<&str, bool>) -> Self {
        let mut items: Vec<(String, String)> = suggestions
            .iter()
            .map(|(provider, message)| (provider.clone(), message.trim().to_string()))
            .collect();
        items.sort_by(|a, b| a.0.cmp(&b.0));
        items.push((PROVIDER_MANUAL.to_string(), String::new()));

        let mut checkboxes: HashMap<&'static str, bool> =
            TOGGLES.iter().map(|t| (t.id, false)).collect();
        for toggle in TOGGLES {
            if let Some(&value) = initial.get(toggle.id) {
                checkboxes.insert(toggle.id, value);
            }
        }

        Self {
            items,
            cursor: 0,
            manual_mode: false,
            manual_input: String::new(),
            checkboxes,
            final_choice: String::new(),
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn final_choice(&self) -> &str {
        &self.final_choice
    }

    pub fn checkboxes(&self) -> &HashMap<&'static str, bool> {
        &self.checkboxes
    }

    fn checked(&self, id: &str) -> bool {
        self.checkboxes.get(id).copied().unwrap_or(false)
    }

    /// Apply one keystroke. All invariants of the toggle table are
    /// enforced here.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.manual_mode {
            self.handle_manual_key(key);
        } else {
            self.handle_selection_key(key);
        }
    }

    fn handle_selection_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.done = true;
            }
            KeyCode::Char('q') => {
                self.done = true;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < self.items.len() {
                    self.cursor += 1;
                }
            }
            KeyCode::Enter => {
                let (provider, message) = &self.items[self.cursor];
                if provider == PROVIDER_MANUAL {
                    self.manual_mode = true;
                    self.manual_input.clear();
                } else {
                    self.final_choice = message.clone();
                    self.done = true;
                }
            }
            KeyCode::Char(c) => self.toggle_by_key(c),
            _ => {}
        }
    }

    fn toggle_by_key(&mut self, key: char) {
        let Some(toggle) = TOGGLES.iter().find(|t| t.key == key) else {
            return;
        };

        // While dry run is set every other toggle is frozen.
        if self.checked(CHECKBOX_DRY_RUN) && toggle.id != CHECKBOX_DRY_RUN {
            return;
        }

        match toggle.kind {
            ToggleKind::TagRadio => {
                let was_checked = self.checked(toggle.id);
                for t in TOGGLES.iter().filter(|t| t.kind == ToggleKind::TagRadio) {
                    self.checkboxes.insert(t.id, false);
                }
                self.checkboxes.insert(toggle.id, !was_checked);
            }
            ToggleKind::Checkbox => {
                let now = !self.checked(toggle.id);
                self.checkboxes.insert(toggle.id, now);
                // Activating dry run clears everything else.
                if toggle.id == CHECKBOX_DRY_RUN && now {
                    for t in TOGGLES.iter().filter(|t| t.id != CHECKBOX_DRY_RUN) {
                        self.checkboxes.insert(t.id, false);
                    }
                }
            }
        }
    }

    fn handle_manual_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.done = true;
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let trimmed = self.manual_input.trim();
                if trimmed.chars().count() >= MIN_COMMIT_MESSAGE_LENGTH {
                    self.final_choice = trimmed.to_string();
                    self.done = true;
                }
            }
            KeyCode::Esc => {
                self.manual_mode = false;
                self.manual_input.clear();
            }
            KeyCode::Enter => self.manual_input.push('\n'),
            KeyCode::Backspace => {
                self.manual_input.pop();
            }
            KeyCode::Char(c) => self.manual_input.push(c),
            _ => {}
        }
    }

    /// Render the model into display lines.
    pub fn view(&self) -> Vec<String> {
        if self.manual_mode {
            return self.view_manual();
        }

        let mut lines = vec![format!("{}{}{}", BOLD, LIST_TITLE, RESET), String::new()];

        for (idx, (provider, message)) in self.items.iter().enumerate() {
            let highlighted = idx == self.cursor;
            let marker = if highlighted { ">" } else { " " };

            if provider == PROVIDER_MANUAL {
                lines.push(format!("{} {}", marker, MANUAL_OPTION_TITLE));
                continue;
            }

            let message_lines: Vec<&str> = message.lines().collect();
            if highlighted {
                lines.push(format!("{} {}{}{}", marker, BOLD, provider, RESET));
                for line in &message_lines {
                    lines.push(format!("    {}", line));
                }
            } else {
                let first = message_lines.first().copied().unwrap_or("");
                let summary = if message_lines.len() > 1 {
                    format!("{} {}(+{} lines){}", first, DIM, message_lines.len() - 1, RESET)
                } else {
                    first.to_string()
                };
                lines.push(format!("{} {}: {}", marker, provider, summary));
            }
        }

        lines.push(String::new());
        lines.push(self.view_footer());
        lines.push(format!("{}{}{}", DIM, FOOTER_HELP, RESET));
        lines
    }

    fn view_footer(&self) -> String {
        let dry_run_active = self.checked(CHECKBOX_DRY_RUN);
        let mut parts = Vec::with_capacity(TOGGLES.len());
        for toggle in TOGGLES {
            let symbol = if self.checked(toggle.id) {
                CHECKED
            } else {
                UNCHECKED
            };
            let frozen = dry_run_active && toggle.id != CHECKBOX_DRY_RUN;
            let cell = format!("[{}] {} {}", toggle.key, symbol, toggle.label);
            if frozen {
                parts.push(format!("{}{}{}", DIM, cell, RESET));
            } else {
                parts.push(cell);
            }
        }
        parts.join("   ")
    }

    fn view_manual(&self) -> Vec<String> {
        let mut lines = vec![format!("{}{}{}", BOLD, MANUAL_INPUT_TITLE, RESET), String::new()];
        let mut input_lines: Vec<String> =
            self.manual_input.split('\n').map(str::to_string).collect();
        if let Some(last) = input_lines.last_mut() {
            last.push_str(CURSOR_BAR);
        }
        lines.extend(input_lines);
        lines.push(String::new());
        lines.push(format!("{}{}{}", DIM, MANUAL_INPUT_HELP, RESET));
        lines
    }
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode().context("failed to enable raw mode")?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let _ = execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show);
    }
}

fn draw(model: &Model) -> Result<()> {
    let mut out = stdout();
    execute!(
        out,
        terminal::Clear(terminal::ClearType::All),
        cursor::MoveTo(0, 0)
    )?;
    for line in model.view() {
        // Raw mode needs explicit carriage returns.
        write!(out, "{}\r\n", line)?;
    }
    out.flush()?;
    Ok(())
}

/// Run the interactive session.
///
/// Returns the chosen message (empty on cancel) plus the final toggle
/// state. The caller overwrites its dry-run/push/tag settings from the
/// returned map.
pub fn run_interactive(
    suggestions: &HashMap<String, String>,
    initial: &HashMap<&str, bool>,
) -> Result<(String, HashMap<&'static str, bool>)> {
    let mut model = Model::new(suggestions, initial);
    let _guard = TerminalGuard::enter()?;

    while !model.is_done() {
        draw(&model)?;
        match event::read()? {
            Event::Key(key) => model.handle_key(key),
            Event::Resize(_, _) => {}
            _ => {}
        }
    }

    Ok((model.final_choice().to_string(), model.checkboxes().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn model_with(suggestions: &[(&str, &str)]) -> Model {
        let map: HashMap<String, String> = suggestions
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Model::new(&map, &HashMap::new())
    }

    #[test]
    fn enter_on_candidate_returns_it() {
        let mut model = model_with(&[("openai", "feat: add parser")]);
        model.handle_key(press(KeyCode::Enter));
        assert!(model.is_done());
        assert_eq!(model.final_choice(), "feat: add parser");
    }

    #[test]
    fn enter_on_sentinel_opens_manual_mode() {
        let mut model = model_with(&[("openai", "feat: x")]);
        model.handle_key(press(KeyCode::Down));
        model.handle_key(press(KeyCode::Enter));
        assert!(!model.is_done());
        assert!(model.manual_mode);
    }

    #[test]
    fn quit_cancels_with_empty_choice() {
        let mut model = model_with(&[("openai", "feat: x")]);
        model.handle_key(press(KeyCode::Char('q')));
        assert!(model.is_done());
        assert_eq!(model.final_choice(), "");
    }

    #[test]
    fn tag_toggles_are_mutually_exclusive() {
        let mut model = model_with(&[("openai", "x")]);
        model.handle_key(press(KeyCode::Char('3')));
        assert!(model.checked(CHECKBOX_TAG_MAJOR));

        model.handle_key(press(KeyCode::Char('4')));
        assert!(!model.checked(CHECKBOX_TAG_MAJOR));
        assert!(model.checked(CHECKBOX_TAG_MINOR));

        // Toggling a checked radio unchecks it.
        model.handle_key(press(KeyCode::Char('4')));
        assert!(!model.checked(CHECKBOX_TAG_MINOR));
    }

    #[test]
    fn dry_run_freezes_and_clears_other_toggles() {
        let mut model = model_with(&[("openai", "x")]);
        model.handle_key(press(KeyCode::Char('2')));
        model.handle_key(press(KeyCode::Char('5')));
        assert!(model.checked(CHECKBOX_PUSH));
        assert!(model.checked(CHECKBOX_TAG_PATCH));

        model.handle_key(press(KeyCode::Char('1')));
        assert!(model.checked(CHECKBOX_DRY_RUN));
        assert!(!model.checked(CHECKBOX_PUSH));
        assert!(!model.checked(CHECKBOX_TAG_PATCH));

        // Frozen while dry run is on.
        model.handle_key(press(KeyCode::Char('2')));
        assert!(!model.checked(CHECKBOX_PUSH));

        // Unfreezing restores normal toggling.
        model.handle_key(press(KeyCode::Char('1')));
        model.handle_key(press(KeyCode::Char('2')));
        assert!(model.checked(CHECKBOX_PUSH));
    }

    #[test]
    fn manual_mode_requires_three_chars() {
        let mut model = model_with(&[]);
        model.handle_key(press(KeyCode::Enter)); // sentinel is the only item
        assert!(model.manual_mode);

        model.handle_key(press(KeyCode::Char('h')));
        model.handle_key(press(KeyCode::Char('i')));
        model.handle_key(ctrl('d'));
        assert!(!model.is_done());

        model.handle_key(press(KeyCode::Char('!')));
        model.handle_key(ctrl('d'));
        assert!(model.is_done());
        assert_eq!(model.final_choice(), "hi!");
    }

    #[test]
    fn manual_mode_newline_and_unicode_backspace() {
        let mut model = model_with(&[]);
        model.handle_key(press(KeyCode::Enter));
        model.handle_key(press(KeyCode::Char('f')));
        model.handle_key(press(KeyCode::Enter));
        model.handle_key(press(KeyCode::Char('é')));
        assert_eq!(model.manual_input, "f\né");

        model.handle_key(press(KeyCode::Backspace));
        assert_eq!(model.manual_input, "f\n");
    }

    #[test]
    fn esc_returns_to_selection() {
        let mut model = model_with(&[("openai", "x")]);
        model.handle_key(press(KeyCode::Down));
        model.handle_key(press(KeyCode::Enter));
        model.handle_key(press(KeyCode::Char('a')));
        model.handle_key(press(KeyCode::Esc));
        assert!(!model.manual_mode);
        assert!(model.manual_input.is_empty());
    }

    #[test]
    fn initial_checkbox_state_is_respected() {
        let map: HashMap<String, String> = [("openai".to_string(), "x".to_string())].into();
        let initial: HashMap<&str, bool> = [(CHECKBOX_PUSH, true)].into();
        let model = Model::new(&map, &initial);
        assert!(model.checked(CHECKBOX_PUSH));
        assert!(!model.checked(CHECKBOX_DRY_RUN));
    }

    #[test]
    fn view_summarizes_multiline_candidates() {
        let mut model = model_with(&[("claude", "feat: a\n\nbody"), ("openai", "fix: b")]);
        // claude sorts first and is highlighted; openai is summarized.
        let rendered = model.view().join("\n");
        assert!(rendered.contains("fix: b"));

        model.handle_key(press(KeyCode::Down));
        let rendered = model.view().join("\n");
        assert!(rendered.contains("(+2 lines)"));
    }
}
