//! View/pagination state machine for the guestbook front end.
//!
//! Unifies two presentations of the same ordered wish list: a "book" (title
//! cover, then two wishes per spread) and a "kindle" (title page, then one
//! wish per page). A create/edit form appears as a synthetic last page; while
//! it is open the machine pages over a frozen snapshot of the list, so live
//! updates cannot shift the pages under the person composing.

use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Book,
    Kindle,
}

/// The observable state: which presentation, positioned where, with the form
/// overlay recorded alongside the page it will return to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    BookSpread(usize),
    KindlePage(usize),
    FormOverlay { return_page: usize },
}

/// What a single page slot displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Title,
    Message(Uuid),
    Form,
    /// The empty right leaf of a final spread with an odd item count.
    Blank,
}

/// Form field state, cleared when the form closes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pub author_name: String,
    pub content: String,
    pub staged_images: Vec<Uuid>,
}

#[derive(Debug)]
struct FormSession {
    frozen: Vec<Uuid>,
    return_mode: ViewMode,
    return_page: usize,
    editing: Option<Uuid>,
    fields: FormFields,
}

#[derive(Debug)]
pub struct ViewStateMachine {
    mode: ViewMode,
    page: usize,
    live: Vec<Uuid>,
    form: Option<FormSession>,
    submitting: bool,
}

impl ViewStateMachine {
    pub fn new(mode: ViewMode) -> Self {
        Self {
            mode,
            page: 0,
            live: Vec::new(),
            form: None,
            submitting: false,
        }
    }

    pub fn state(&self) -> ViewState {
        if let Some(form) = &self.form {
            if self.page == self.last_page() {
                return ViewState::FormOverlay {
                    return_page: form.return_page,
                };
            }
        }
        match self.mode {
            ViewMode::Book => ViewState::BookSpread(self.page),
            ViewMode::Kindle => ViewState::KindlePage(self.page),
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn current_page(&self) -> usize {
        self.page
    }

    pub fn form_open(&self) -> bool {
        self.form.is_some()
    }

    pub fn editing(&self) -> Option<Uuid> {
        self.form.as_ref().and_then(|f| f.editing)
    }

    pub fn form_fields(&self) -> Option<&FormFields> {
        self.form.as_ref().map(|f| &f.fields)
    }

    pub fn form_fields_mut(&mut self) -> Option<&mut FormFields> {
        self.form.as_mut().map(|f| &mut f.fields)
    }

    /// The list currently being paged: frozen while the form is open.
    pub fn visible_messages(&self) -> &[Uuid] {
        match &self.form {
            Some(form) => &form.frozen,
            None => &self.live,
        }
    }

    /// Replace the live list from a store refresh. A frozen snapshot, when
    /// present, keeps paging stable; only the live copy moves.
    pub fn set_live_messages(&mut self, messages: Vec<Uuid>) {
        self.live = messages;
        if self.form.is_none() {
            self.page = self.page.min(self.last_page());
        }
    }

    // -- Page arithmetic ------------------------------------------------

    /// Items after the title: wishes, plus the form page while open.
    fn item_count(&self) -> usize {
        self.visible_messages().len() + usize::from(self.form.is_some())
    }

    /// Kindle page count: title + items.
    pub fn total_pages(&self) -> usize {
        1 + self.item_count()
    }

    /// Book spread count: cover + two items per spread.
    pub fn total_spreads(&self) -> usize {
        1 + self.item_count().div_ceil(2)
    }

    fn last_page(&self) -> usize {
        match self.mode {
            ViewMode::Book => self.total_spreads() - 1,
            ViewMode::Kindle => self.total_pages() - 1,
        }
    }

    fn item_at(&self, index: usize) -> Page {
        let messages = self.visible_messages();
        if index < messages.len() {
            Page::Message(messages[index])
        } else if self.form.is_some() && index == messages.len() {
            Page::Form
        } else {
            Page::Blank
        }
    }

    /// Content of one kindle page.
    pub fn kindle_page(&self, page: usize) -> Page {
        if page == 0 {
            Page::Title
        } else {
            self.item_at(page - 1)
        }
    }

    /// Both leaves of one book spread. The cover spread shows the title with
    /// an empty facing leaf.
    pub fn spread(&self, spread: usize) -> (Page, Page) {
        if spread == 0 {
            return (Page::Title, Page::Blank);
        }
        let first = 2 * (spread - 1);
        (self.item_at(first), self.item_at(first + 1))
    }

    /// Page-number indicator for a spread: an absent facing page shows no
    /// number rather than a number beyond the total.
    pub fn spread_page_numbers(&self, spread: usize) -> (Option<usize>, Option<usize>) {
        let (left, right) = self.spread(spread);
        let number = |page: Page, index: usize| match page {
            Page::Message(_) | Page::Form => Some(index + 1),
            Page::Title | Page::Blank => None,
        };
        if spread == 0 {
            return (None, None);
        }
        let first = 2 * (spread - 1);
        (number(left, first), number(right, first + 1))
    }

    // -- Navigation -----------------------------------------------------

    pub fn next_page(&mut self) {
        if self.page < self.last_page() {
            self.page += 1;
        }
    }

    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    /// Switch presentations, mapping the message-based position rather than
    /// the raw page index: the target page contains the same first visible
    /// item.
    pub fn toggle_mode(&mut self) {
        let (mode, page) = match self.mode {
            ViewMode::Kindle => {
                let spread = if self.page == 0 {
                    0
                } else {
                    1 + (self.page - 1) / 2
                };
                (ViewMode::Book, spread)
            }
            ViewMode::Book => {
                let page = if self.page == 0 {
                    0
                } else {
                    2 * (self.page - 1) + 1
                };
                (ViewMode::Kindle, page)
            }
        };
        self.mode = mode;
        self.page = page.min(self.last_page_in(mode));
        debug!("view: toggled to {:?} page {}", self.mode, self.page);
    }

    fn last_page_in(&self, mode: ViewMode) -> usize {
        match mode {
            ViewMode::Book => self.total_spreads() - 1,
            ViewMode::Kindle => self.total_pages() - 1,
        }
    }

    fn page_containing(&self, item_index: usize) -> usize {
        match self.mode {
            ViewMode::Kindle => item_index + 1,
            ViewMode::Book => 1 + item_index / 2,
        }
    }

    // -- Form overlay ---------------------------------------------------

    /// Freeze the live list and jump to the synthetic form page. A second
    /// open while the form is already up is ignored.
    pub fn open_form(&mut self, editing: Option<Uuid>) {
        if self.form.is_some() {
            return;
        }
        self.form = Some(FormSession {
            frozen: self.live.clone(),
            return_mode: self.mode,
            return_page: self.page,
            editing,
            fields: FormFields::default(),
        });
        self.page = self.last_page();
        debug!("view: form opened at page {} (editing: {:?})", self.page, editing);
    }

    /// Discard the snapshot, clear the fields, go back where the reader was.
    pub fn close_form(&mut self) {
        if let Some(form) = self.form.take() {
            self.mode = form.return_mode;
            self.page = form.return_page.min(self.last_page());
            self.submitting = false;
            debug!("view: form closed, back to page {}", self.page);
        }
    }

    /// Claim the single in-flight submit slot. Returns false when a submit
    /// is already pending — the caller must not dispatch another.
    pub fn begin_submit(&mut self) -> bool {
        if self.submitting || self.form.is_none() {
            return false;
        }
        self.submitting = true;
        true
    }

    /// The in-flight submit failed; the form stays open for another try.
    pub fn submit_failed(&mut self) {
        self.submitting = false;
    }

    /// The submit landed. The form closes and the view repositions onto the
    /// submitted wish's page in the refreshed live list — for a create that
    /// is the last page of the default ordering.
    pub fn submit_succeeded(&mut self, message_id: Uuid, live: Vec<Uuid>) {
        let form = self.form.take();
        self.submitting = false;
        self.live = live;

        match self.live.iter().position(|id| *id == message_id) {
            Some(index) => {
                self.page = self.page_containing(index).min(self.last_page());
            }
            None => {
                // Deleted out from under us mid-submit; fall back to where
                // the reader came from.
                let return_page = form.as_ref().map_or(0, |f| f.return_page);
                self.page = return_page.min(self.last_page());
            }
        }
        debug!("view: submit landed, now at page {}", self.page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn kindle_with(n: usize) -> (ViewStateMachine, Vec<Uuid>) {
        let mut vsm = ViewStateMachine::new(ViewMode::Kindle);
        let messages = ids(n);
        vsm.set_live_messages(messages.clone());
        (vsm, messages)
    }

    #[test]
    fn kindle_page_count_is_title_plus_messages() {
        let (vsm, _) = kindle_with(5);
        assert_eq!(vsm.total_pages(), 6);
        assert_eq!(vsm.kindle_page(0), Page::Title);
    }

    #[test]
    fn open_form_adds_a_page_and_freezes_content() {
        let (mut vsm, messages) = kindle_with(5);

        vsm.open_form(None);
        assert_eq!(vsm.total_pages(), 7);
        assert_eq!(vsm.current_page(), 6);
        assert_eq!(vsm.kindle_page(6), Page::Form);

        // A sixth wish arrives from the server mid-edit: the frozen pages
        // must not move.
        let mut grown = messages.clone();
        grown.push(Uuid::new_v4());
        vsm.set_live_messages(grown);

        assert_eq!(vsm.total_pages(), 7);
        for (i, id) in messages.iter().enumerate() {
            assert_eq!(vsm.kindle_page(i + 1), Page::Message(*id));
        }
    }

    #[test]
    fn close_form_restores_position_and_clears_fields() {
        let (mut vsm, _) = kindle_with(5);
        vsm.next_page();
        vsm.next_page();
        assert_eq!(vsm.current_page(), 2);

        vsm.open_form(None);
        vsm.form_fields_mut().unwrap().author_name = "Ana".into();
        vsm.form_fields_mut().unwrap().content = "half-typed".into();

        vsm.close_form();
        assert_eq!(vsm.current_page(), 2);
        assert!(!vsm.form_open());
        assert!(vsm.form_fields().is_none());

        // Reopening starts from blank fields.
        vsm.open_form(None);
        assert_eq!(vsm.form_fields().unwrap(), &FormFields::default());
    }

    #[test]
    fn navigation_is_clamped_at_both_ends() {
        let (mut vsm, _) = kindle_with(2);
        vsm.prev_page();
        assert_eq!(vsm.current_page(), 0);

        vsm.next_page();
        vsm.next_page();
        vsm.next_page();
        vsm.next_page();
        assert_eq!(vsm.current_page(), 2);
    }

    #[test]
    fn mode_toggle_maps_the_message_position() {
        let (mut vsm, messages) = kindle_with(6);

        // Kindle page 4 shows message index 3.
        for _ in 0..4 {
            vsm.next_page();
        }
        assert_eq!(vsm.kindle_page(4), Page::Message(messages[3]));

        // Book spread 2 holds message indices 2 and 3.
        vsm.toggle_mode();
        assert_eq!(vsm.state(), ViewState::BookSpread(2));
        let (left, right) = vsm.spread(2);
        assert_eq!(left, Page::Message(messages[2]));
        assert_eq!(right, Page::Message(messages[3]));

        // Back to kindle: lands on the spread's first visible message.
        vsm.toggle_mode();
        assert_eq!(vsm.state(), ViewState::KindlePage(3));
        assert_eq!(vsm.kindle_page(3), Page::Message(messages[2]));
    }

    #[test]
    fn title_maps_to_title_across_modes() {
        let (mut vsm, _) = kindle_with(4);
        vsm.toggle_mode();
        assert_eq!(vsm.state(), ViewState::BookSpread(0));
        assert_eq!(vsm.spread(0), (Page::Title, Page::Blank));
        vsm.toggle_mode();
        assert_eq!(vsm.state(), ViewState::KindlePage(0));
    }

    #[test]
    fn odd_count_leaves_final_right_leaf_blank_and_unnumbered() {
        let mut vsm = ViewStateMachine::new(ViewMode::Book);
        let messages = ids(5);
        vsm.set_live_messages(messages.clone());

        // Cover + three message spreads.
        assert_eq!(vsm.total_spreads(), 4);
        let (left, right) = vsm.spread(3);
        assert_eq!(left, Page::Message(messages[4]));
        assert_eq!(right, Page::Blank);
        assert_eq!(vsm.spread_page_numbers(3), (Some(5), None));
        assert_eq!(vsm.spread_page_numbers(2), (Some(3), Some(4)));
        assert_eq!(vsm.spread_page_numbers(0), (None, None));
    }

    #[test]
    fn submit_create_lands_on_the_new_wish() {
        let (mut vsm, messages) = kindle_with(5);
        vsm.open_form(None);
        assert!(vsm.begin_submit());

        // The created wish sorts last in the default ordering.
        let new_id = Uuid::new_v4();
        let mut live = messages.clone();
        live.push(new_id);
        vsm.submit_succeeded(new_id, live);

        assert!(!vsm.form_open());
        assert_eq!(vsm.state(), ViewState::KindlePage(6));
        assert_eq!(vsm.kindle_page(6), Page::Message(new_id));
    }

    #[test]
    fn submit_edit_follows_the_live_index() {
        let (mut vsm, messages) = kindle_with(5);
        vsm.open_form(Some(messages[1]));
        assert!(vsm.begin_submit());

        // Another wish was deleted while the form was open: the edited wish
        // now sits at index 0 of the live list.
        let live = vec![messages[1], messages[3], messages[4]];
        vsm.submit_succeeded(messages[1], live);

        assert_eq!(vsm.state(), ViewState::KindlePage(1));
        assert_eq!(vsm.kindle_page(1), Page::Message(messages[1]));
    }

    #[test]
    fn reentrant_submit_is_suppressed() {
        let (mut vsm, _) = kindle_with(3);
        vsm.open_form(None);
        assert!(vsm.begin_submit());
        assert!(!vsm.begin_submit());

        vsm.submit_failed();
        assert!(vsm.form_open());
        assert!(vsm.begin_submit());
    }

    #[test]
    fn form_page_in_book_mode_fills_the_blank_leaf() {
        let mut vsm = ViewStateMachine::new(ViewMode::Book);
        vsm.set_live_messages(ids(5));

        vsm.open_form(None);
        // Five wishes + form = six items: still cover + three spreads, with
        // the form on the previously blank right leaf.
        assert_eq!(vsm.total_spreads(), 4);
        let (_, right) = vsm.spread(3);
        assert_eq!(right, Page::Form);
        assert_eq!(vsm.current_page(), 3);
        assert_eq!(vsm.state(), ViewState::FormOverlay { return_page: 0 });
    }

    #[test]
    fn shrinking_live_list_clamps_the_page() {
        let (mut vsm, messages) = kindle_with(5);
        for _ in 0..5 {
            vsm.next_page();
        }
        assert_eq!(vsm.current_page(), 5);

        vsm.set_live_messages(messages[..2].to_vec());
        assert_eq!(vsm.current_page(), 2);
    }
}
