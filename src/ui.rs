use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::debug;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};
use std::{io, time::Duration};
use textwrap::wrap;
use tui_input::{backend::crossterm::EventHandler, Input};

use palaver::chat::ChatSession;
use palaver::models::{Contact, DeliveryStatus, Message, Sender};

// Export types needed by main module
pub use ratatui::backend::CrosstermBackend;
pub use ratatui::Terminal;

/// What the user asked for, carried out by the main loop
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Quit,
    Send(String),
    Select(u64),
    Search(String),
    AddContact { name: String, phone: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Focus {
    Messages,
    Contacts,
    Search,
}

struct ContactAddDialog {
    name: Input,
    phone: Input,
    on_phone: bool, // Which field has the cursor
}

pub struct ChatUI {
    input: Input,
    search: Input,
    focus: Focus,
    contact_index: usize,
    contact_add_dialog: Option<ContactAddDialog>,
    help_visible: bool,
    notice: Option<(String, chrono::DateTime<chrono::Utc>)>,
    user_label: String,
}

impl ChatUI {
    pub fn new(user_label: &str) -> Self {
        ChatUI {
            input: Input::default(),
            search: Input::default(),
            focus: Focus::Messages,
            contact_index: 0,
            contact_add_dialog: None,
            help_visible: false,
            notice: None,
            user_label: user_label.to_string(),
        }
    }

    /// Show a short status line message, cleared by `clean_notice`
    pub fn set_notice(&mut self, text: &str) {
        self.notice = Some((text.to_string(), chrono::Utc::now()));
    }

    pub fn clean_notice(&mut self, timeout_secs: i64) {
        if let Some((_, shown_at)) = &self.notice {
            if (chrono::Utc::now() - *shown_at).num_seconds() > timeout_secs {
                self.notice = None;
            }
        }
    }

    /// Keep the sidebar cursor on the selected contact after the list changed
    pub fn sync_contact_index(&mut self, session: &ChatSession) {
        let visible = session.visible_contacts();
        let selected = session.selected_contact().map(|c| c.id);
        self.contact_index = selected
            .and_then(|id| visible.iter().position(|c| c.id == id))
            .unwrap_or(0);
    }

    pub fn handle_input(&mut self, session: &ChatSession) -> Result<Option<UiAction>> {
        if !event::poll(Duration::from_millis(10))? {
            return Ok(None);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(None);
        };
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }
        Ok(self.handle_key(key, session))
    }

    fn handle_key(&mut self, key: KeyEvent, session: &ChatSession) -> Option<UiAction> {
        if self.help_visible {
            // Any key closes help
            self.help_visible = false;
            return None;
        }

        if self.contact_add_dialog.is_some() {
            return self.handle_dialog_key(key);
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return Some(UiAction::Quit),
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Messages => Focus::Contacts,
                    Focus::Contacts => Focus::Search,
                    Focus::Search => Focus::Messages,
                };
                return None;
            }
            KeyCode::Char('a') if ctrl => {
                self.contact_add_dialog = Some(ContactAddDialog {
                    name: Input::default(),
                    phone: Input::default(),
                    on_phone: false,
                });
                return None;
            }
            KeyCode::Char('h') if ctrl => {
                self.help_visible = true;
                return None;
            }
            _ => {}
        }

        match self.focus {
            Focus::Messages => match key.code {
                KeyCode::Enter => {
                    if session.is_sending() {
                        debug!("UI: input disabled while a message is in flight");
                        return None;
                    }
                    let text = self.input.value().trim().to_string();
                    if text.is_empty() {
                        return None;
                    }
                    self.input = Input::default();
                    Some(UiAction::Send(text))
                }
                _ => {
                    self.input.handle_event(&Event::Key(key));
                    None
                }
            },
            Focus::Contacts => {
                let visible = session.visible_contacts();
                if visible.is_empty() {
                    return None;
                }
                let len = visible.len();
                match key.code {
                    KeyCode::Up => {
                        self.contact_index = (self.contact_index.min(len - 1) + len - 1) % len
                    }
                    KeyCode::Down => self.contact_index = (self.contact_index + 1) % len,
                    KeyCode::Enter => {
                        self.focus = Focus::Messages;
                    }
                    _ => return None,
                }
                let contact = visible[self.contact_index.min(len - 1)];
                if session.selected_contact().map(|c| c.id) != Some(contact.id) {
                    return Some(UiAction::Select(contact.id));
                }
                None
            }
            Focus::Search => {
                if key.code == KeyCode::Enter {
                    self.focus = Focus::Contacts;
                    return None;
                }
                self.search.handle_event(&Event::Key(key));
                self.contact_index = 0;
                Some(UiAction::Search(self.search.value().to_string()))
            }
        }
    }

    fn handle_dialog_key(&mut self, key: KeyEvent) -> Option<UiAction> {
        let dialog = self.contact_add_dialog.as_mut()?;
        match key.code {
            KeyCode::Esc => {
                self.contact_add_dialog = None;
                None
            }
            KeyCode::Tab | KeyCode::Up | KeyCode::Down => {
                dialog.on_phone = !dialog.on_phone;
                None
            }
            KeyCode::Enter => {
                let name = dialog.name.value().trim().to_string();
                if name.is_empty() {
                    dialog.on_phone = false;
                    return None;
                }
                let phone = dialog.phone.value().trim().to_string();
                self.contact_add_dialog = None;
                Some(UiAction::AddContact { name, phone })
            }
            _ => {
                let field = if dialog.on_phone { &mut dialog.phone } else { &mut dialog.name };
                field.handle_event(&Event::Key(key));
                None
            }
        }
    }

    pub fn draw<B: Backend>(&self, frame: &mut Frame<B>, session: &ChatSession) {
        let size = frame.size();

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(30), // Sidebar
                Constraint::Percentage(70), // Chat panel
            ])
            .split(size);

        let sidebar = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Search box
                Constraint::Min(3),    // Contacts
            ])
            .split(chunks[0]);

        let chat_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),    // Messages area
                Constraint::Length(3), // Input box
                Constraint::Length(1), // Help line
            ])
            .split(chunks[1]);

        let search_widget = Paragraph::new(self.search.value()).block(
            Block::default()
                .title("Search")
                .borders(Borders::ALL)
                .border_style(self.border_style(Focus::Search)),
        );
        frame.render_widget(search_widget, sidebar[0]);

        self.draw_contacts(frame, session, sidebar[1]);
        draw_messages(frame, session, chat_chunks[0]);

        let input_title = if session.is_sending() {
            "Message (sending...)"
        } else {
            "Message"
        };
        let input_widget = Paragraph::new(self.input.value()).block(
            Block::default()
                .title(input_title)
                .borders(Borders::ALL)
                .border_style(self.border_style(Focus::Messages)),
        );
        frame.render_widget(input_widget, chat_chunks[1]);

        let status_text = match &self.notice {
            Some((text, _)) => Span::styled(text.clone(), Style::default().fg(Color::Yellow)),
            None => Span::styled(
                format!("{} | ESC quit | TAB focus | Ctrl+A add | Ctrl+H help", self.user_label),
                Style::default().fg(Color::Gray),
            ),
        };
        frame.render_widget(Paragraph::new(Line::from(vec![status_text])), chat_chunks[2]);

        match self.focus {
            Focus::Messages => frame.set_cursor(
                chat_chunks[1].x + self.input.cursor() as u16 + 1,
                chat_chunks[1].y + 1,
            ),
            Focus::Search => frame.set_cursor(
                sidebar[0].x + self.search.cursor() as u16 + 1,
                sidebar[0].y + 1,
            ),
            Focus::Contacts => {}
        }

        if let Some(dialog) = &self.contact_add_dialog {
            draw_add_contact_dialog(frame, dialog, size);
        }
        if self.help_visible {
            draw_help_dialog(frame, size);
        }
    }

    fn border_style(&self, focus: Focus) -> Style {
        if self.focus == focus {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        }
    }

    fn draw_contacts<B: Backend>(&self, frame: &mut Frame<B>, session: &ChatSession, area: Rect) {
        let selected = session.selected_contact().map(|c| c.id);
        let width = area.width.saturating_sub(4) as usize;

        let items: Vec<ListItem> = session
            .visible_contacts()
            .into_iter()
            .map(|c| {
                let marker = if Some(c.id) == selected { "> " } else { "  " };
                let header = Line::from(vec![
                    Span::raw(marker),
                    Span::raw(contact_header(c)),
                ]);
                let preview: String = c.last_message.chars().take(width).collect();
                let detail = Line::from(Span::styled(
                    format!("  {}", preview),
                    Style::default().fg(Color::Gray),
                ));
                ListItem::new(vec![header, detail])
            })
            .collect();

        let mut state = ListState::default();
        if !items.is_empty() {
            state.select(Some(self.contact_index.min(items.len() - 1)));
        }

        let list = List::new(items)
            .block(
                Block::default()
                    .title("Contacts")
                    .borders(Borders::ALL)
                    .border_style(self.border_style(Focus::Contacts)),
            )
            .highlight_style(Style::default().add_modifier(Modifier::BOLD));
        frame.render_stateful_widget(list, area, &mut state);
    }
}

/// Sidebar line for a contact: presence dot, name, time and unread badge
fn contact_header(contact: &Contact) -> String {
    let presence = if contact.online { "●" } else { "○" };
    let unread = if contact.unread > 0 {
        format!(" ({})", contact.unread)
    } else {
        String::new()
    };
    let time = if contact.last_message_time.is_empty() {
        String::new()
    } else {
        format!(" {}", contact.last_message_time)
    };
    format!("{} {}{}{}", presence, contact.name, time, unread)
}

/// Delivery ticks shown after outgoing messages
fn status_indicator(status: DeliveryStatus) -> &'static str {
    match status {
        DeliveryStatus::Sending => " …",
        DeliveryStatus::Sent => " ✓",
        DeliveryStatus::Delivered => " ✓✓",
        DeliveryStatus::Read => " ✓✓",
        DeliveryStatus::Error => " ✗",
    }
}

fn sender_label(message: &Message, contact_name: &str) -> String {
    match message.sender {
        Sender::Me => "You".to_string(),
        Sender::Contact => contact_name.to_string(),
        Sender::Ai => "Assistant".to_string(),
    }
}

fn message_style(message: &Message) -> Style {
    match (message.sender, message.status) {
        (_, DeliveryStatus::Error) => Style::default().fg(Color::Red),
        (Sender::Me, DeliveryStatus::Read) => Style::default().fg(Color::Cyan),
        (Sender::Me, DeliveryStatus::Delivered) => Style::default().fg(Color::Green),
        (Sender::Me, _) => Style::default().fg(Color::Blue),
        (Sender::Ai, _) => Style::default().fg(Color::Magenta),
        (Sender::Contact, _) => Style::default(),
    }
}

fn draw_messages<B: Backend>(f: &mut Frame<B>, session: &ChatSession, area: Rect) {
    let wrap_width = area.width.saturating_sub(2).max(1) as usize; // Account for borders

    let Some(contact) = session.selected_contact() else {
        let placeholder =
            Paragraph::new("Select a contact to start chatting (Tab to the contact list)")
                .block(Block::default().borders(Borders::ALL).title("Messages"));
        f.render_widget(placeholder, area);
        return;
    };

    let items: Vec<ListItem> = session
        .current_messages()
        .iter()
        .flat_map(|m| {
            let ticks = if m.is_outgoing() { status_indicator(m.status) } else { "" };
            let full_content = format!(
                "[{}] {}: {}{}",
                m.timestamp,
                sender_label(m, &contact.name),
                m.text,
                ticks
            );
            let style = message_style(m);

            wrap(&full_content, wrap_width)
                .into_iter()
                .map(|l| l.into_owned())
                .collect::<Vec<String>>()
                .into_iter()
                .map(move |line| ListItem::new(Text::from(line)).style(style))
        })
        .collect();

    let presence = if contact.online { "online" } else { "offline" };
    let title = if session.sending_to() == Some(contact.id) {
        format!("{} ({}) - typing...", contact.name, presence)
    } else {
        format!("{} ({}) {}", contact.name, presence, contact.phone)
    };

    // Keep the newest message in view
    let mut list_state = ListState::default();
    if !items.is_empty() {
        list_state.select(Some(items.len() - 1));
    }

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default());
    f.render_stateful_widget(list, area, &mut list_state);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn draw_add_contact_dialog<B: Backend>(f: &mut Frame<B>, dialog: &ContactAddDialog, area: Rect) {
    let popup_area = centered(area, 50, 10);

    let popup_block = Block::default()
        .title("Add New Contact")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    f.render_widget(Clear, popup_area);
    f.render_widget(popup_block, popup_area);

    let inner_area = popup_area.inner(&Margin {
        vertical: 1,
        horizontal: 2,
    });

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Name
            Constraint::Length(3), // Phone
            Constraint::Min(0),
        ])
        .split(inner_area);

    let field = |title: &'static str, input: &Input, active: bool| {
        Paragraph::new(input.value().to_string()).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(if active {
                    Style::default().fg(Color::Blue)
                } else {
                    Style::default()
                }),
        )
    };

    f.render_widget(field("Name", &dialog.name, !dialog.on_phone), chunks[0]);
    f.render_widget(field("Phone", &dialog.phone, dialog.on_phone), chunks[1]);

    let (active, input) = if dialog.on_phone {
        (chunks[1], &dialog.phone)
    } else {
        (chunks[0], &dialog.name)
    };
    f.set_cursor(active.x + input.cursor() as u16 + 1, active.y + 1);
}

fn draw_help_dialog<B: Backend>(f: &mut Frame<B>, area: Rect) {
    let popup_area = centered(area, 64, 18);

    let popup_block = Block::default()
        .title("Keyboard Shortcuts")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    f.render_widget(Clear, popup_area);
    f.render_widget(popup_block, popup_area);

    let inner_area = popup_area.inner(&Margin {
        vertical: 1,
        horizontal: 2,
    });

    let shortcuts = [
        ("General", ""),
        ("ESC", "Quit"),
        ("Tab", "Cycle focus: message, contacts, search"),
        ("", ""),
        ("Contacts", ""),
        ("Up/Down", "Move through contacts and open the conversation"),
        ("Ctrl+A", "Add a new contact"),
        ("", ""),
        ("Messages", ""),
        ("Enter", "Send (disabled while a reply is pending)"),
        ("", ""),
        ("Press any key to close this dialog", ""),
    ];

    let items: Vec<ListItem> = shortcuts
        .iter()
        .map(|(key, desc)| {
            if desc.is_empty() {
                ListItem::new(Text::styled(
                    key.to_string(),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ))
            } else {
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<10}", key), Style::default().fg(Color::Green)),
                    Span::raw(desc.to_string()),
                ]))
            }
        })
        .collect();

    f.render_widget(List::new(items), inner_area);
}

pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

pub fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
