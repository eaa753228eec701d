/*
 *  tests/scheduler_scenarios.rs
 *
 *  Scheduler driven end to end against a recording panel
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 */

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use nasink::display::{Button, DisplayError, EpaperDisplay, ExitAction, Frame, Lifecycle, RefreshMode};
use nasink::pages::default_menu;
use nasink::ui::{DisplayMode, Page, PageScheduler, SchedulerError, Tick};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Call {
    InitFull,
    InitPartial,
    Reset,
    Clear,
    Display(usize),
    Sleep,
    Fan(bool),
}

#[derive(Default)]
struct Panel {
    calls: Mutex<Vec<Call>>,
}

impl Panel {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn displays(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, Call::Display(_))).count()
    }

    fn push(&self, call: Call) -> Result<(), DisplayError> {
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl EpaperDisplay for Panel {
    fn init_board(&self) -> Result<(), DisplayError> { Ok(()) }
    fn is_connected(&self) -> bool { true }
    fn init(&self, mode: RefreshMode) -> Result<(), DisplayError> {
        self.push(match mode {
            RefreshMode::Full => Call::InitFull,
            RefreshMode::Partial => Call::InitPartial,
        })
    }
    fn reset(&self) -> Result<(), DisplayError> { self.push(Call::Reset) }
    fn clear(&self, _bg: u8) -> Result<(), DisplayError> { self.push(Call::Clear) }
    fn display(&self, frame: &Frame) -> Result<(), DisplayError> { self.push(Call::Display(frame.width())) }
    fn sleep(&self) -> Result<(), DisplayError> { self.push(Call::Sleep) }
    fn set_fan(&self, on: bool) -> Result<(), DisplayError> { self.push(Call::Fan(on)) }
    fn set_led(&self, _on: bool) -> Result<(), DisplayError> { Ok(()) }
}

fn blank(name: &str, interval: f64) -> Page {
    Page::new(name, interval, |ctx| Ok(Some(ctx.new_frame())))
}

fn setup(names: &[&str]) -> (PageScheduler, Arc<Panel>, Arc<Lifecycle>) {
    let panel = Arc::new(Panel::default());
    let lifecycle = Arc::new(Lifecycle::new(panel.clone()));
    let mut scheduler = PageScheduler::new(Arc::clone(&lifecycle))
        .with_idle_tick(Duration::from_millis(1))
        .with_menu(default_menu(3));
    scheduler.add_pages(names.iter().map(|n| blank(n, 1.0)));
    (scheduler, panel, lifecycle)
}

#[test]
fn ok_sub_ok_back_lands_on_first_page() {
    let (mut s, panel, _) = setup(&["Disk 1", "Load"]);
    s.select_index().unwrap();
    let t0 = Instant::now();

    assert_eq!(s.tick(None, t0).unwrap(), Tick::Drawn);
    s.tick(Some(Button::Ok), t0).unwrap();
    assert_eq!(s.mode(), DisplayMode::Menu);
    s.tick(Some(Button::Sub), t0).unwrap();
    assert_eq!(s.menu().unwrap().index(), 1);
    s.tick(Some(Button::Ok), t0).unwrap();
    assert_eq!(s.active_page().unwrap().name(), "Power off");
    s.tick(Some(Button::Back), t0).unwrap();

    assert_eq!(s.mode(), DisplayMode::Pages);
    assert_eq!(s.active_page().unwrap().name(), "Disk 1");
    assert_eq!(s.menu().unwrap().index(), 0);
    // coming back after a detour redraws in full
    let tail: Vec<Call> = panel.calls().into_iter().rev().take(4).collect();
    assert_eq!(tail, vec![Call::Display(250), Call::Clear, Call::Reset, Call::InitFull]);
}

#[test]
fn refresh_interval_gates_panel_writes() {
    let panel = Arc::new(Panel::default());
    let lifecycle = Arc::new(Lifecycle::new(panel.clone()));
    let mut s = PageScheduler::new(lifecycle);
    s.add_page(blank("Slow", 10.0));
    s.select_index().unwrap();

    let t0 = Instant::now();
    assert_eq!(s.tick(None, t0).unwrap(), Tick::Drawn);
    assert_eq!(s.tick(None, t0 + Duration::from_secs(1)).unwrap(), Tick::Idle);
    assert_eq!(panel.displays(), 1);

    assert_eq!(s.tick(None, t0 + Duration::from_secs(11)).unwrap(), Tick::Drawn);
    assert_eq!(panel.displays(), 2);
    // second draw switched to the partial waveform
    assert!(panel.calls().contains(&Call::InitPartial));
}

#[test]
fn add_and_sub_wrap_around() {
    let (mut s, _, _) = setup(&["A", "B", "C"]);
    s.select_index().unwrap();
    let t0 = Instant::now();

    s.tick(Some(Button::Add), t0).unwrap();
    assert_eq!(s.active_page().unwrap().name(), "C");
    s.tick(Some(Button::Sub), t0).unwrap();
    s.tick(Some(Button::Sub), t0).unwrap();
    assert_eq!(s.active_page().unwrap().name(), "B");
}

#[test]
fn vertical_frames_are_portrait() {
    let (s, panel, _) = setup(&["A"]);
    let mut s = s.with_orientation(nasink::display::Orientation::Vertical);
    s.select_index().unwrap();
    s.tick(None, Instant::now()).unwrap();
    assert!(panel.calls().contains(&Call::Display(122)));
}

#[test]
fn run_stops_when_a_page_requests_reboot() {
    let panel = Arc::new(Panel::default());
    let lifecycle = Arc::new(Lifecycle::new(panel.clone()));
    let mut s = PageScheduler::new(Arc::clone(&lifecycle)).with_idle_tick(Duration::from_millis(1));

    let draws = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&draws);
    s.add_page(Page::new("Countdown", 0.001, move |ctx| {
        if seen.fetch_add(1, Ordering::SeqCst) == 2 {
            ctx.lifecycle().request(ExitAction::Reboot)?;
            return Ok(None);
        }
        Ok(Some(ctx.new_frame()))
    }));

    let (_tx, mut rx) = mpsc::channel::<Button>(4);
    assert_eq!(s.run(&mut rx).unwrap(), ExitAction::Reboot);
    assert_eq!(draws.load(Ordering::SeqCst), 3);

    let calls = panel.calls();
    assert_eq!(&calls[calls.len() - 5..], &[Call::Fan(false), Call::InitFull, Call::Clear, Call::Reset, Call::Sleep]);
    assert!(lifecycle.is_shut_down());
}

#[test]
fn run_fails_when_keys_go_away() {
    let (mut s, _, _) = setup(&["A"]);
    let (tx, mut rx) = mpsc::channel::<Button>(1);
    drop(tx);
    assert!(matches!(s.run(&mut rx), Err(SchedulerError::ButtonQueueClosed)));
}

#[tokio::test]
async fn stop_request_waits_for_the_draw_in_flight() {
    let panel = Arc::new(Panel::default());
    let lifecycle = Arc::new(Lifecycle::new(panel.clone()));
    let mut s = PageScheduler::new(Arc::clone(&lifecycle)).with_idle_tick(Duration::from_millis(1));

    let drawing = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&drawing);
    s.add_page(Page::new("Slow", 0.001, move |ctx| {
        flag.store(true, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(200));
        Ok(Some(ctx.new_frame()))
    }));

    let (_tx, mut rx) = mpsc::channel::<Button>(1);
    let worker = tokio::task::spawn_blocking(move || s.run(&mut rx));

    while !drawing.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    // what a signal does: ask, wait, then the fallback shutdown
    lifecycle.request_stop();
    assert_eq!(worker.await.unwrap().unwrap(), ExitAction::Exit);
    lifecycle.shutdown().unwrap();

    let calls = panel.calls();
    assert!(calls.contains(&Call::Display(250)));
    assert_eq!(&calls[calls.len() - 5..], &[Call::Fan(false), Call::InitFull, Call::Clear, Call::Reset, Call::Sleep]);
    assert_eq!(calls.iter().filter(|c| **c == Call::Sleep).count(), 1);
}

#[test]
fn queued_presses_get_a_tick_each() {
    let panel = Arc::new(Panel::default());
    let lifecycle = Arc::new(Lifecycle::new(panel.clone()));
    let mut s = PageScheduler::new(Arc::clone(&lifecycle)).with_idle_tick(Duration::from_millis(1));

    let drawn = Arc::new(Mutex::new(Vec::new()));
    for name in ["A", "B", "C"] {
        let log = Arc::clone(&drawn);
        s.add_page(Page::new(name, 1000.0, move |ctx| {
            log.lock().unwrap().push(name);
            if name == "C" {
                ctx.lifecycle().request_stop();
            }
            Ok(Some(ctx.new_frame()))
        }));
    }

    let (tx, mut rx) = mpsc::channel::<Button>(4);
    tx.try_send(Button::Sub).unwrap();
    tx.try_send(Button::Sub).unwrap();

    assert_eq!(s.run(&mut rx).unwrap(), ExitAction::Exit);
    // A never comes due before the first press is taken
    assert_eq!(*drawn.lock().unwrap(), vec!["B", "C"]);
    assert_eq!(panel.displays(), 2);
}

#[test]
fn dump_writes_the_index_page() {
    let (s, panel, _) = setup(&["A", "B"]);
    let mut s = s.with_index_page(Some("B".into()));
    let path = std::env::temp_dir().join(format!("nasink-dump-{}.pbm", std::process::id()));

    assert!(s.dump_index_page(&path).unwrap());
    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"P1\n250 122\n"));
    assert_eq!(panel.displays(), 0);
    let _ = std::fs::remove_file(path);
}
