/*
 *  ui/page.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Pages, their refresh cadence and the context handed to content providers
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

use std::fmt;
use std::time::{Duration, Instant};

use crate::display::framebuffer::Frame;
use crate::display::panel::Orientation;
use crate::display::service::Lifecycle;
use crate::ui::menu::MenuView;

/// Failure raised by a content provider
pub type ContentError = Box<dyn std::error::Error + Send + Sync>;

/// `Ok(None)` means "nothing to draw this time"
pub type ContentResult = Result<Option<Frame>, ContentError>;

pub type ContentFn = Box<dyn FnMut(&PageContext<'_>) -> ContentResult + Send>;

// Negative and non-finite intervals mean "draw once", like 0
fn interval_secs(secs: f64) -> f64 {
    if secs.is_finite() { secs.max(0.0) } else { 0.0 }
}

/// A named screen with its own refresh cadence.
///
/// The redraw counter drives the panel init lifecycle: 0 means the next
/// draw does a full init, 1 allows switching to partial refresh, anything
/// above is steady state. Only `reset_counters` lowers it.
pub struct Page {
    name: String,
    refresh_interval: f64,
    full_redraw: bool,
    drawn_at: Option<Instant>,
    counter: u32,
    content: ContentFn,
}

impl Page {
    /// `refresh_interval` is in seconds, 0 disables timed redraws
    pub fn new<F>(name: impl Into<String>, refresh_interval: f64, content: F) -> Self
    where
        F: FnMut(&PageContext<'_>) -> ContentResult + Send + 'static,
    {
        Self {
            name: name.into(),
            refresh_interval: interval_secs(refresh_interval),
            full_redraw: false,
            drawn_at: None,
            counter: 0,
            content: Box::new(content),
        }
    }

    /// Never switch this page to partial refresh
    pub fn full_redraw(mut self, full: bool) -> Self {
        self.full_redraw = full;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn refresh_interval(&self) -> f64 {
        self.refresh_interval
    }

    pub fn is_full_redraw(&self) -> bool {
        self.full_redraw
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn drawn_at(&self) -> Option<Instant> {
        self.drawn_at
    }

    pub fn reset_counters(&mut self) {
        self.drawn_at = None;
        self.counter = 0;
    }

    pub fn is_first_time_display(&self) -> bool {
        self.counter == 0
    }

    pub fn stop_refreshing(&mut self) {
        self.refresh_interval = 0.0;
    }

    pub fn set_refresh_interval(&mut self, secs: f64) {
        self.refresh_interval = interval_secs(secs);
    }

    /// Never drawn, or the interval has run out since the last draw
    pub fn is_due(&self, now: Instant) -> bool {
        match self.drawn_at {
            None => true,
            Some(_) if self.refresh_interval == 0.0 => false,
            // an interval too long for a Duration never runs out
            Some(at) => match Duration::try_from_secs_f64(self.refresh_interval) {
                Ok(interval) => now.saturating_duration_since(at) >= interval,
                Err(_) => false,
            },
        }
    }

    pub(crate) fn render(&mut self, ctx: &PageContext<'_>) -> ContentResult {
        (self.content)(ctx)
    }

    pub(crate) fn mark_drawn(&mut self, at: Instant) {
        self.drawn_at = Some(at);
    }

    pub(crate) fn bump_counter(&mut self) {
        self.counter = self.counter.saturating_add(1);
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("name", &self.name)
            .field("refresh_interval", &self.refresh_interval)
            .field("full_redraw", &self.full_redraw)
            .field("counter", &self.counter)
            .finish()
    }
}

/// The page last shown on the panel, as seen by the next provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownPage {
    pub name: String,
    pub first_time: bool,
}

/// What a content provider can see while rendering
pub struct PageContext<'a> {
    pub(crate) current: Option<&'a ShownPage>,
    pub(crate) menu: Option<&'a MenuView>,
    pub(crate) lifecycle: &'a Lifecycle,
    pub(crate) orientation: Orientation,
}

impl<'a> PageContext<'a> {
    pub fn new(lifecycle: &'a Lifecycle, orientation: Orientation) -> Self {
        Self { current: None, menu: None, lifecycle, orientation }
    }

    pub fn with_current(mut self, current: Option<&'a ShownPage>) -> Self {
        self.current = current;
        self
    }

    pub fn with_menu(mut self, menu: Option<&'a MenuView>) -> Self {
        self.menu = menu;
        self
    }

    /// Last successfully shown page, `None` before the first draw
    pub fn current_page(&self) -> Option<&ShownPage> {
        self.current
    }

    pub fn menu(&self) -> Option<&MenuView> {
        self.menu
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        self.lifecycle
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Blank white frame sized for the configured orientation
    pub fn new_frame(&self) -> Frame {
        let (w, h) = self.orientation.frame_size();
        Frame::new(w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(interval: f64) -> Page {
        Page::new("p", interval, |_| Ok(None))
    }

    #[test]
    fn first_time_until_counted() {
        let mut p = page(1.0);
        assert!(p.is_first_time_display());
        p.bump_counter();
        assert!(!p.is_first_time_display());
        p.bump_counter();
        assert_eq!(p.counter(), 2);
        p.reset_counters();
        assert!(p.is_first_time_display());
        assert!(p.drawn_at().is_none());
    }

    #[test]
    fn zero_interval_never_comes_due_again() {
        let now = Instant::now();
        let mut p = page(0.0);
        assert!(p.is_due(now));
        p.mark_drawn(now);
        assert!(!p.is_due(now + Duration::from_secs(3600)));
    }

    #[test]
    fn interval_gates_redraw() {
        let now = Instant::now();
        let mut p = page(0.5);
        p.mark_drawn(now);
        assert!(!p.is_due(now + Duration::from_millis(499)));
        assert!(p.is_due(now + Duration::from_millis(500)));
    }

    #[test]
    fn refresh_controls() {
        let now = Instant::now();
        let mut p = page(2.0);
        p.mark_drawn(now);
        p.stop_refreshing();
        assert_eq!(p.refresh_interval(), 0.0);
        assert!(!p.is_due(now + Duration::from_secs(10)));
        p.set_refresh_interval(0.8);
        assert!(p.is_due(now + Duration::from_secs(1)));
        p.set_refresh_interval(-3.0);
        assert_eq!(p.refresh_interval(), 0.0);
    }

    #[test]
    fn unbounded_intervals_do_not_panic() {
        let now = Instant::now();
        let later = now + Duration::from_secs(60);

        let mut p = page(f64::INFINITY);
        assert_eq!(p.refresh_interval(), 0.0);
        p.mark_drawn(now);
        assert!(!p.is_due(later));

        p.set_refresh_interval(f64::NAN);
        assert_eq!(p.refresh_interval(), 0.0);

        p.set_refresh_interval(1e300);
        assert!(!p.is_due(later));
    }
}
