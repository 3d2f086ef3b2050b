use crate::{
    error::NavigationMisuse,
    file_node::FileNode,
    navigator::{Navigator, Row},
    progress::{ProgressReporter, ProgressTick},
    scanner::{ScanHandle, ScanReport, ScanStatus, Scanner},
    utils::format_size,
};
use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::ListState;
use std::{path::PathBuf, time::Duration};
use tracing::debug;

const PAGE_SIZE: usize = 10;

/// State of a walk in progress. Dropping it stops the progress ticker and
/// cancels the walk.
pub struct ScanningPage {
    pub root: PathBuf,
    pub last_tick: Option<ProgressTick>,
    ticks: Receiver<ProgressTick>,
    reporter: ProgressReporter,
    scan: ScanHandle,
}

impl ScanningPage {
    pub fn start(root: PathBuf, scanner: &Scanner, interval: Duration) -> Result<Self> {
        let scan = scanner.spawn(root.clone())?;
        let (tx, ticks) = crossbeam_channel::unbounded();
        let reporter = ProgressReporter::spawn(interval, scan.control().counter(), tx)
            .context("failed to start progress reporter")?;
        Ok(Self {
            root,
            last_tick: None,
            ticks,
            reporter,
            scan,
        })
    }

    /// Close the scanning display: no more ticks, walk cancelled
    pub fn dispose(mut self) {
        self.reporter.stop();
        self.scan.cancel();
    }
}

pub enum Page {
    Scanning(ScanningPage),
    Results(ResultsPage),
    /// Key bindings drawn over the results they return to
    Help(ResultsPage),
    /// Nothing left to show; the app is shutting down
    Closed,
}

/// A finished scan being browsed
pub struct ResultsPage {
    pub navigator: Navigator,
    pub state: ListState,
    pub error_count: usize,
    selection_history: Vec<Option<usize>>,
}

impl ResultsPage {
    pub fn new(report: ScanReport) -> Self {
        let mut page = Self {
            navigator: Navigator::new(report.tree),
            state: ListState::default(),
            error_count: report.errors.len(),
            selection_history: Vec::new(),
        };
        page.reset_selection();
        page
    }

    fn row_count(&self) -> usize {
        self.navigator.current().row_count()
    }

    pub fn current_rows(&self) -> Vec<Row> {
        self.navigator.current().rows().collect()
    }

    pub fn current_dir(&self) -> Option<&FileNode> {
        self.navigator.tree().node(self.navigator.current().dir())
    }

    pub fn current_path(&self) -> PathBuf {
        self.current_dir().map(|n| n.path.clone()).unwrap_or_default()
    }

    pub fn current_total_size(&self) -> u64 {
        self.navigator.tree().size(self.navigator.current().dir())
    }

    pub fn current_item_count(&self) -> u64 {
        self.navigator.tree().count(self.navigator.current().dir())
    }

    /// Size of the whole scanned tree
    pub fn total_size(&self) -> u64 {
        let tree = self.navigator.tree();
        tree.size(tree.root())
    }

    fn reset_selection(&mut self) {
        if self.row_count() == 0 {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn next(&mut self) {
        let rows = self.row_count();
        if rows == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 >= rows => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let rows = self.row_count();
        if rows == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) => rows - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let rows = self.row_count();
        if rows == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + PAGE_SIZE).min(rows - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.row_count() == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => i.saturating_sub(PAGE_SIZE),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn go_to_first(&mut self) {
        if self.row_count() > 0 {
            self.state.select(Some(0));
        }
    }

    pub fn go_to_last(&mut self) {
        let rows = self.row_count();
        if rows > 0 {
            self.state.select(Some(rows - 1));
        }
    }

    /// Enter the selected directory, or go up when the ".." row is selected
    pub fn enter_selected(&mut self) {
        let Some(row) = self.state.selected() else {
            return;
        };
        match self.navigator.activate(row) {
            Ok(()) => {
                self.selection_history.push(Some(row));
                self.reset_selection();
            }
            Err(NavigationMisuse::NotADirectory) => {}
            Err(misuse) => debug!(%misuse, row, "selection ignored"),
        }
    }

    /// Return to the previous view with its selection
    pub fn back(&mut self) -> Result<(), NavigationMisuse> {
        self.navigator.pop()?;
        let restored = self.selection_history.pop().flatten();
        let rows = self.row_count();
        self.state.select(restored.filter(|i| *i < rows).or((rows > 0).then_some(0)));
        Ok(())
    }

    /// Title line for the current directory
    pub fn current_title(&self) -> String {
        format!(
            "{} ({} items, {})",
            self.current_path().display(),
            self.current_item_count(),
            format_size(self.current_total_size())
        )
    }
}

/// Application State
pub struct App {
    pub page: Page,
    pub status_message: Option<String>,
    pub should_quit: bool,
    fatal: Option<anyhow::Error>,
}

impl App {
    pub fn scanning(root: PathBuf, scanner: &Scanner, interval: Duration) -> Result<Self> {
        let page = ScanningPage::start(root, scanner, interval)?;
        Ok(Self::with_page(Page::Scanning(page)))
    }

    /// Skip straight to the results of a finished scan
    pub fn with_results(report: ScanReport) -> Self {
        let mut app = Self::with_page(Page::Closed);
        app.show_results(report);
        app
    }

    fn with_page(page: Page) -> Self {
        Self {
            page,
            status_message: None,
            should_quit: false,
            fatal: None,
        }
    }

    /// The error that ended the scan, if any
    pub fn take_fatal(&mut self) -> Option<anyhow::Error> {
        self.fatal.take()
    }

    /// The results being browsed, with or without the help overlay
    pub fn results(&self) -> Option<&ResultsPage> {
        match &self.page {
            Page::Results(results) | Page::Help(results) => Some(results),
            Page::Scanning(_) | Page::Closed => None,
        }
    }

    /// Pull progress ticks and the completion signal onto the UI thread
    pub fn poll_background(&mut self) {
        let Page::Scanning(page) = &mut self.page else {
            return;
        };
        if let Some(tick) = page.ticks.try_iter().last() {
            page.last_tick = Some(tick);
        }
        match page.scan.try_finish() {
            ScanStatus::Pending => {}
            ScanStatus::Finished(Ok(report)) => self.show_results(report),
            ScanStatus::Finished(Err(err)) => {
                self.fatal = Some(err);
                self.quit();
            }
        }
    }

    /// Swap in `next`, disposing a scanning page if that is what it replaces
    fn replace_page(&mut self, next: Page) {
        if let Page::Scanning(page) = std::mem::replace(&mut self.page, next) {
            page.dispose();
        }
    }

    fn quit(&mut self) {
        self.replace_page(Page::Closed);
        self.should_quit = true;
    }

    fn show_results(&mut self, report: ScanReport) {
        let mut message = format!(
            "Scanned {} entries in {:.1}s",
            report.entries_seen,
            report.elapsed.as_secs_f64()
        );
        if !report.errors.is_empty() {
            message.push_str(&format!(", {} unreadable", report.errors.len()));
        }
        self.status_message = Some(message);
        self.replace_page(Page::Results(ResultsPage::new(report)));
    }

    fn toggle_help(&mut self) {
        self.page = match std::mem::replace(&mut self.page, Page::Closed) {
            Page::Results(results) => Page::Help(results),
            Page::Help(results) => Page::Results(results),
            other => other,
        };
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit();
            return;
        }

        let mut open_help = false;
        match &mut self.page {
            Page::Scanning(_) => {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    self.quit();
                }
            }
            // Any key closes help
            Page::Help(_) => self.toggle_help(),
            Page::Results(results) => {
                self.status_message = None;
                match (key.code, key.modifiers) {
                    (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => self.should_quit = true,
                    (KeyCode::Char('?'), _) => open_help = true,
                    // Navigation
                    (KeyCode::Down, _) | (KeyCode::Char('j'), _) => results.next(),
                    (KeyCode::Up, _) | (KeyCode::Char('k'), _) => results.previous(),
                    (KeyCode::Char('d'), KeyModifiers::CONTROL) | (KeyCode::PageDown, _) => results.page_down(),
                    (KeyCode::Char('u'), KeyModifiers::CONTROL) | (KeyCode::PageUp, _) => results.page_up(),
                    (KeyCode::Char('H'), _) | (KeyCode::Home, _) => results.go_to_first(),
                    (KeyCode::Char('G'), _) | (KeyCode::End, _) => results.go_to_last(),
                    // Actions
                    (KeyCode::Enter, _) | (KeyCode::Right, _) | (KeyCode::Char('l'), _) | (KeyCode::Char('o'), _) => results.enter_selected(),
                    (KeyCode::Backspace, _) | (KeyCode::Left, _) | (KeyCode::Char('h'), _) | (KeyCode::Char('u'), _) => {
                        if let Err(misuse) = results.back() {
                            debug!(%misuse, "back ignored");
                            self.status_message = Some(format!("{} (press q to quit)", misuse));
                        }
                    }
                    _ => {}
                }
            }
            Page::Closed => {}
        }
        if open_help {
            self.toggle_help();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_node::{FileNode, FileTree};
    use anyhow::Context;
    use crossterm::event::KeyEventKind;
    use indextree::NodeId;
    use std::{fs, path::Path, thread};
    use tempfile::TempDir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, KeyEventKind::Press)
    }

    fn add(tree: &mut FileTree, parent: NodeId, name: &str, size: u64, is_dir: bool) -> Result<NodeId> {
        let path = tree.node(parent).context("parent")?.path.join(name);
        tree.insert(parent, FileNode::new(path, name.to_string(), size, is_dir, None))
            .context("insert")
    }

    fn results(app: &App) -> Result<&ResultsPage> {
        app.results().context("not on the results page")
    }

    /// /scan { big.bin: 500, docs { a.txt: 20, b.txt: 10 }, tiny: 1 }
    fn app() -> Result<App> {
        let mut tree = FileTree::new(Path::new("/scan"), None);
        let root = tree.root();
        add(&mut tree, root, "big.bin", 500, false)?;
        let docs = add(&mut tree, root, "docs", 0, true)?;
        add(&mut tree, docs, "a.txt", 20, false)?;
        add(&mut tree, docs, "b.txt", 10, false)?;
        add(&mut tree, root, "tiny", 1, false)?;
        Ok(App::with_results(ScanReport {
            tree,
            errors: Vec::new(),
            entries_seen: 5,
            elapsed: Duration::from_millis(20),
        }))
    }

    /// Polls like the event loop does until the scanning page is gone
    fn poll_until_scanned(app: &mut App) -> Result<()> {
        for _ in 0..500 {
            app.poll_background();
            if !matches!(app.page, Page::Scanning(_)) {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(10));
        }
        anyhow::bail!("scan did not finish in time")
    }

    #[test]
    fn starts_on_root_view() -> Result<()> {
        let app = app()?;
        let page = results(&app)?;
        assert!(matches!(app.page, Page::Results(_)));
        assert_eq!(page.state.selected(), Some(0));
        assert_eq!(page.current_total_size(), 531);
        assert_eq!(page.current_item_count(), 5);
        assert_eq!(page.current_rows().len(), 3);
        Ok(())
    }

    #[test]
    fn enter_and_back_restore_selection() -> Result<()> {
        let mut app = app()?;
        app.on_key(key(KeyCode::Down));
        app.on_key(key(KeyCode::Enter));
        let page = results(&app)?;
        assert_eq!(page.current_path(), PathBuf::from("/scan/docs"));
        assert_eq!(page.current_rows().first(), Some(&Row::Up));
        assert_eq!(page.state.selected(), Some(0));

        app.on_key(key(KeyCode::Backspace));
        let page = results(&app)?;
        assert_eq!(page.current_path(), PathBuf::from("/scan"));
        assert_eq!(page.state.selected(), Some(1));
        Ok(())
    }

    #[test]
    fn enter_on_file_does_nothing() -> Result<()> {
        let mut app = app()?;
        app.on_key(key(KeyCode::Enter));
        let page = results(&app)?;
        assert_eq!(page.current_path(), PathBuf::from("/scan"));
        assert_eq!(page.navigator.depth(), 1);
        Ok(())
    }

    #[test]
    fn back_at_root_only_sets_status() -> Result<()> {
        let mut app = app()?;
        app.on_key(key(KeyCode::Backspace));
        assert!(!app.should_quit);
        assert_eq!(results(&app)?.navigator.depth(), 1);
        assert!(app.status_message.is_some());
        Ok(())
    }

    #[test]
    fn up_row_pushes_parent_view() -> Result<()> {
        let mut app = app()?;
        app.on_key(key(KeyCode::Char('j')));
        app.on_key(key(KeyCode::Char('l')));
        // Row 0 is ".."
        app.on_key(key(KeyCode::Enter));
        let page = results(&app)?;
        assert_eq!(page.current_path(), PathBuf::from("/scan"));
        assert_eq!(page.navigator.depth(), 3);
        Ok(())
    }

    #[test]
    fn selection_wraps() -> Result<()> {
        let mut app = app()?;
        app.on_key(key(KeyCode::Up));
        assert_eq!(results(&app)?.state.selected(), Some(2));
        app.on_key(key(KeyCode::Down));
        assert_eq!(results(&app)?.state.selected(), Some(0));
        app.on_key(key(KeyCode::End));
        assert_eq!(results(&app)?.state.selected(), Some(2));
        app.on_key(key(KeyCode::PageUp));
        assert_eq!(results(&app)?.state.selected(), Some(0));
        Ok(())
    }

    #[test]
    fn help_keeps_the_results_underneath() -> Result<()> {
        let mut app = app()?;
        app.on_key(key(KeyCode::Down));
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Char('?')));
        assert!(matches!(app.page, Page::Help(_)));
        assert_eq!(results(&app)?.current_path(), PathBuf::from("/scan/docs"));

        app.on_key(key(KeyCode::Char('x')));
        assert!(matches!(app.page, Page::Results(_)));
        assert_eq!(results(&app)?.navigator.depth(), 2);
        assert!(!app.should_quit);
        app.on_key(key(KeyCode::Char('q')));
        assert!(app.should_quit);
        Ok(())
    }

    #[test]
    fn finished_scan_moves_to_results() -> Result<()> {
        let root = TempDir::new()?;
        fs::write(root.path().join("a.bin"), vec![b'A'; 60])?;
        fs::create_dir(root.path().join("d"))?;
        fs::write(root.path().join("d").join("b.bin"), vec![b'B'; 40])?;

        let scanner = Scanner::default();
        let mut app = App::scanning(root.path().to_path_buf(), &scanner, Duration::from_millis(10))?;
        assert!(matches!(app.page, Page::Scanning(_)));
        poll_until_scanned(&mut app)?;

        let page = results(&app)?;
        assert_eq!(page.total_size(), 100);
        assert_eq!(page.current_item_count(), 3);
        assert_eq!(page.error_count, 0);
        assert!(app.status_message.as_deref().is_some_and(|m| m.starts_with("Scanned 3 entries")));
        assert!(!app.should_quit);
        Ok(())
    }

    #[test]
    fn failed_scan_closes_with_fatal_error() -> Result<()> {
        let root = TempDir::new()?;
        let gone = root.path().join("gone");

        let scanner = Scanner::default();
        let mut app = App::scanning(gone, &scanner, Duration::from_millis(10))?;
        poll_until_scanned(&mut app)?;

        assert!(app.should_quit);
        assert!(matches!(app.page, Page::Closed));
        assert!(app.results().is_none());
        assert!(app.take_fatal().is_some());
        Ok(())
    }

    #[test]
    fn quitting_while_scanning_cancels_and_silences_ticks() -> Result<()> {
        let root = TempDir::new()?;
        for a in 0..20 {
            let dir = root.path().join(format!("d-{a}"));
            fs::create_dir(&dir)?;
            for b in 0..20 {
                fs::write(dir.join(format!("f-{b}")), b"x")?;
            }
        }

        let interval = Duration::from_millis(5);
        let mut app = App::scanning(root.path().to_path_buf(), &Scanner::default(), interval)?;
        let (control, ticks) = match &app.page {
            Page::Scanning(page) => (page.scan.control().clone(), page.ticks.clone()),
            _ => anyhow::bail!("expected the scanning page"),
        };

        app.on_key(key(KeyCode::Char('q')));
        assert!(app.should_quit);
        assert!(matches!(app.page, Page::Closed));
        assert!(control.is_cancelled());

        let _already_sent: Vec<ProgressTick> = ticks.try_iter().collect();
        thread::sleep(interval * 4);
        assert!(ticks.try_recv().is_err());
        Ok(())
    }
}
