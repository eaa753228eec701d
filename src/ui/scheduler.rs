/*
 *  ui/scheduler.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Page scheduler - button navigation, refresh cadence and the
 *  full/partial redraw lifecycle
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};
use thiserror::Error;
use tokio::sync::mpsc::Receiver;
use tokio::sync::mpsc::error::TryRecvError;

use crate::display::button::Button;
use crate::display::error::DisplayError;
use crate::display::framebuffer::Frame;
use crate::display::panel::{Orientation, BG_WHITE};
use crate::display::service::{ExitAction, Lifecycle};
use crate::display::traits::EpaperDisplay;
use crate::ui::menu::Menu;
use crate::ui::page::{ContentError, Page, PageContext, ShownPage};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("no pages added to the ui")]
    NoPages,
    #[error("index page not found: {0}")]
    IndexPageNotFound(String),
    #[error("page '{page}' failed: {source}")]
    Content {
        page: String,
        #[source]
        source: ContentError,
    },
    #[error("display error: {0}")]
    Display(#[from] DisplayError),
    #[error("background task failed: {0}")]
    Background(String),
    #[error("button queue closed")]
    ButtonQueueClosed,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Pages,
    Menu,
}

/// Where a page lives. Menu pages are shown without joining the page list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRef {
    List(usize),
    MenuRoot,
    MenuItem(usize),
}

/// Result of one control loop pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// nothing due
    Idle,
    /// provider had nothing to draw
    Skipped,
    Drawn,
}

pub struct PageScheduler {
    pages: Vec<Page>,
    menu: Option<Menu>,
    index_page: Option<String>,
    lifecycle: Arc<Lifecycle>,
    orientation: Orientation,
    idle_tick: Duration,
    mode: DisplayMode,
    page_index: usize,
    active: PageRef,
    current: Option<PageRef>,
}

impl PageScheduler {
    pub fn new(lifecycle: Arc<Lifecycle>) -> Self {
        Self {
            pages: Vec::new(),
            menu: None,
            index_page: None,
            lifecycle,
            orientation: Orientation::Horizontal,
            idle_tick: Duration::from_millis(20),
            mode: DisplayMode::Pages,
            page_index: 0,
            active: PageRef::List(0),
            current: None,
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_idle_tick(mut self, tick: Duration) -> Self {
        self.idle_tick = tick;
        self
    }

    pub fn with_index_page(mut self, name: Option<String>) -> Self {
        self.index_page = name;
        self
    }

    pub fn with_menu(mut self, menu: Menu) -> Self {
        self.menu = Some(menu);
        self
    }

    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    pub fn add_pages(&mut self, pages: impl IntoIterator<Item = Page>) {
        self.pages.extend(pages);
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn menu(&self) -> Option<&Menu> {
        self.menu.as_ref()
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn active(&self) -> PageRef {
        self.active
    }

    pub fn active_page(&self) -> Option<&Page> {
        self.page(self.active)
    }

    /// Last page that made it to the panel
    pub fn current_page(&self) -> Option<&Page> {
        self.current.and_then(|r| self.page(r))
    }

    pub fn page(&self, r: PageRef) -> Option<&Page> {
        match r {
            PageRef::List(i) => self.pages.get(i),
            PageRef::MenuRoot => self.menu.as_ref().map(Menu::page),
            PageRef::MenuItem(i) => self.menu.as_ref()?.items().get(i)?.page(),
        }
    }

    fn page_mut(&mut self, r: PageRef) -> Option<&mut Page> {
        match r {
            PageRef::List(i) => self.pages.get_mut(i),
            PageRef::MenuRoot => self.menu.as_mut().map(Menu::page_mut),
            PageRef::MenuItem(i) => self.menu.as_mut()?.item_mut(i)?.page_mut(),
        }
    }

    /// Check the page list and point at the index page
    pub fn select_index(&mut self) -> Result<(), SchedulerError> {
        if self.pages.is_empty() {
            return Err(SchedulerError::NoPages);
        }

        let idx = match self.index_page.as_deref() {
            None | Some("") => 0,
            Some(name) => self.pages
                .iter()
                .position(|p| p.name() == name)
                .ok_or_else(|| SchedulerError::IndexPageNotFound(name.to_string()))?,
        };

        self.page_index = idx;
        self.active = PageRef::List(idx);
        self.mode = DisplayMode::Pages;
        Ok(())
    }

    /// Apply one key press. The page being left always loses its redraw
    /// state so it comes back with a full refresh. A press that leads
    /// nowhere keeps the active page.
    pub fn navigate(&mut self, button: Button) {
        let outgoing = self.active;
        if let Some(page) = self.page_mut(outgoing) {
            page.reset_counters();
        }

        let next = match button {
            Button::Ok => self.on_ok(),
            Button::Back => {
                self.page_index = 0;
                if let Some(menu) = self.menu.as_mut() {
                    menu.reset_index();
                }
                self.mode = DisplayMode::Pages;
                Some(PageRef::List(0))
            }
            Button::Add => self.step(false),
            Button::Sub => self.step(true),
        };

        if let Some(next) = next {
            if next != outgoing {
                info!("Page {:?} -> {:?} ({:?})", outgoing, next, button);
            }
            self.active = next;
        } else {
            debug!("{:?} has nowhere to go from {:?}", button, outgoing);
        }
    }

    fn on_ok(&mut self) -> Option<PageRef> {
        let menu = self.menu.as_ref()?;
        match self.mode {
            DisplayMode::Pages => {
                self.mode = DisplayMode::Menu;
                Some(PageRef::MenuRoot)
            }
            DisplayMode::Menu => {
                let idx = menu.index();
                menu.selected()?.page()?;
                self.mode = DisplayMode::Pages;
                Some(PageRef::MenuItem(idx))
            }
        }
    }

    fn step(&mut self, forward: bool) -> Option<PageRef> {
        match self.mode {
            DisplayMode::Pages => {
                let len = self.pages.len();
                if len == 0 {
                    return None;
                }
                self.page_index = if forward {
                    (self.page_index + 1) % len
                } else {
                    self.page_index.checked_sub(1).unwrap_or(len - 1)
                };
                Some(PageRef::List(self.page_index))
            }
            DisplayMode::Menu => {
                let menu = self.menu.as_mut()?;
                if forward {
                    menu.move_next();
                } else {
                    menu.move_previous();
                }
                Some(PageRef::MenuRoot)
            }
        }
    }

    /// Connect, program the full waveform, pulse reset and blank the panel
    pub fn startup(&mut self) -> Result<(), SchedulerError> {
        let display = self.lifecycle.display();
        display.init_board()?;
        display.init_full()?;
        display.reset()?;
        display.clear(BG_WHITE)?;
        self.mode = DisplayMode::Pages;
        info!("Panel ready, starting on {:?}", self.active_page().map(Page::name));
        Ok(())
    }

    /// One control loop pass: apply at most one key press, then draw the
    /// active page if it is due.
    pub fn tick(&mut self, event: Option<Button>, now: Instant) -> Result<Tick, SchedulerError> {
        if let Some(button) = event {
            debug!("Key {:?}", button);
            self.navigate(button);
        }

        let due = self.active_page().map(|p| p.is_due(now)).unwrap_or(false);
        if !due {
            return Ok(Tick::Idle);
        }
        self.draw_active(now)
    }

    fn shown(&self) -> Option<ShownPage> {
        self.current_page().map(|p| ShownPage {
            name: p.name().to_string(),
            first_time: p.is_first_time_display(),
        })
    }

    fn draw_active(&mut self, now: Instant) -> Result<Tick, SchedulerError> {
        let active = self.active;
        let shown = self.shown();
        let menu = self.menu.as_ref().map(Menu::view);
        let lifecycle = Arc::clone(&self.lifecycle);
        let orientation = self.orientation;

        let Some(page) = self.page_mut(active) else {
            return Ok(Tick::Idle);
        };

        let ctx = PageContext::new(&lifecycle, orientation)
            .with_current(shown.as_ref())
            .with_menu(menu.as_ref());

        let tick = draw_page(page, &ctx, now)?;
        self.current = Some(active);
        Ok(tick)
    }

    /// Set when an exit action or a signal has shut the panel down
    pub fn stop_requested(&self) -> Option<ExitAction> {
        if self.lifecycle.is_shut_down() {
            Some(self.lifecycle.requested().unwrap_or(ExitAction::Exit))
        } else {
            None
        }
    }

    /// Run until the lifecycle shuts down or something fails. The board
    /// may already be connected; startup tolerates that.
    ///
    /// Blocking: meant for `tokio::task::spawn_blocking`. A stop requested
    /// from another task is honoured between draws, and the shutdown
    /// sequence then runs here so it never interleaves with a draw.
    pub fn run(&mut self, events: &mut Receiver<Button>) -> Result<ExitAction, SchedulerError> {
        self.select_index()?;
        self.startup()?;

        loop {
            if self.lifecycle.is_stopping() && !self.lifecycle.is_shut_down() {
                info!("Stop requested, shutting the panel down");
                self.lifecycle.shutdown()?;
            }
            if let Some(action) = self.stop_requested() {
                info!("Scheduler stopping for {:?}", action);
                return Ok(action);
            }

            let event = match events.try_recv() {
                Ok(button) => Some(button),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => return Err(SchedulerError::ButtonQueueClosed),
            };

            if self.tick(event, Instant::now())? == Tick::Idle {
                thread::sleep(self.idle_tick);
            }
        }
    }

    /// Render the index page to a PBM file without touching the panel
    pub fn dump_index_page(&mut self, path: &Path) -> Result<bool, SchedulerError> {
        self.select_index()?;
        let active = self.active;
        let lifecycle = Arc::clone(&self.lifecycle);
        let orientation = self.orientation;

        let Some(page) = self.page_mut(active) else {
            return Err(SchedulerError::NoPages);
        };
        let ctx = PageContext::new(&lifecycle, orientation);
        let frame: Option<Frame> = page.render(&ctx).map_err(|source| SchedulerError::Content {
            page: page.name().to_string(),
            source,
        })?;

        match frame {
            Some(frame) => {
                frame.save_pbm(path)?;
                info!("Page '{}' written to {}", page.name(), path.display());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// The draw time is stamped even when the provider skips or fails
fn draw_page(page: &mut Page, ctx: &PageContext<'_>, now: Instant) -> Result<Tick, SchedulerError> {
    let rendered = page.render(ctx);
    page.mark_drawn(now);

    let frame = match rendered {
        Ok(Some(frame)) => frame,
        Ok(None) => {
            debug!("Page '{}' skipped this draw", page.name());
            return Ok(Tick::Skipped);
        }
        Err(source) => {
            return Err(SchedulerError::Content { page: page.name().to_string(), source });
        }
    };

    let display = ctx.lifecycle().display();
    prepare_panel(page, display.as_ref())?;
    display.display(&frame)?;
    page.bump_counter();
    debug!("Page '{}' drawn, counter {}", page.name(), page.counter());
    Ok(Tick::Drawn)
}

/// Full init on the first draw, partial on the second unless the page
/// insists on full refreshes, nothing after that.
fn prepare_panel(page: &Page, display: &dyn EpaperDisplay) -> Result<(), DisplayError> {
    match page.counter() {
        0 => {
            debug!("Page '{}' full init", page.name());
            display.init_full()?;
            display.reset()?;
            display.clear(BG_WHITE)
        }
        1 if !page.is_full_redraw() => {
            debug!("Page '{}' partial init", page.name());
            display.init_partial()
        }
        _ => Ok(()),
    }
}
