//! Render Loop
//!
//! One `tick` per host frame: the clock produces a `Frame` event, the core
//! advances its controls and answers with commands, and the shell applies
//! them and redraws. Hosts drive `tick` from whatever frame callback they
//! have (an animation-frame future in the browser, `RedrawRequested` on
//! desktop, the XR session's frame callback in immersive mode).

use cubic_protocol::{Command, Core, Event, FrameEvent, LifecycleEvent};

/// Platform side of the loop.
pub trait Shell {
    /// Apply commands emitted by the core.
    fn execute(&mut self, commands: Vec<Command>);

    /// Redraw the whole scene.
    fn draw(&mut self);
}

/// Turns host timestamps (milliseconds) into `FrameEvent`s.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    start: Option<f64>,
    last: Option<f64>,
    frame: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time never runs backwards: an earlier `now_ms` gives `dt = 0`.
    pub fn tick(&mut self, now_ms: f64) -> FrameEvent {
        let start = *self.start.get_or_insert(now_ms);
        let last = self.last.unwrap_or(now_ms);
        let now_ms = now_ms.max(last);
        self.last = Some(now_ms);

        let event = FrameEvent {
            time: now_ms - start,
            dt: ((now_ms - last) / 1000.0) as f32,
            frame: self.frame,
        };
        self.frame += 1;
        event
    }

    pub fn frames(&self) -> u64 {
        self.frame
    }
}

#[derive(Debug, Default)]
pub struct RenderLoop {
    clock: FrameClock,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick<C, S>(&mut self, core: &mut C, shell: &mut S, now_ms: f64) -> FrameEvent
    where
        C: Core + ?Sized,
        S: Shell + ?Sized,
    {
        let frame = self.clock.tick(now_ms);
        let commands = core.handle(Event::Lifecycle(LifecycleEvent::Frame(frame)));
        if !commands.is_empty() {
            shell.execute(commands);
        }
        shell.draw();
        frame
    }

    pub fn frames(&self) -> u64 {
        self.clock.frames()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubic_protocol::{DebugCommand, LogLevel};

    #[derive(Default)]
    struct RecordingShell {
        executed: Vec<Command>,
        draws: u32,
    }

    impl Shell for RecordingShell {
        fn execute(&mut self, commands: Vec<Command>) {
            self.executed.extend(commands);
        }

        fn draw(&mut self) {
            self.draws += 1;
        }
    }

    struct CountingCore {
        frames: Vec<FrameEvent>,
    }

    impl Core for CountingCore {
        fn handle(&mut self, event: Event) -> Vec<Command> {
            if let Event::Lifecycle(LifecycleEvent::Frame(frame)) = event {
                self.frames.push(frame);
                if frame.frame == 1 {
                    return vec![Command::Debug(DebugCommand::Log {
                        level: LogLevel::Debug,
                        message: "second frame".into(),
                    })];
                }
            }
            Vec::new()
        }
    }

    #[test]
    fn test_clock_measures_from_first_tick() {
        let mut clock = FrameClock::new();
        let first = clock.tick(1000.0);
        assert_eq!(first.time, 0.0);
        assert_eq!(first.dt, 0.0);
        assert_eq!(first.frame, 0);

        let second = clock.tick(1016.0);
        assert_eq!(second.time, 16.0);
        assert!((second.dt - 0.016).abs() < 1e-6);
        assert_eq!(second.frame, 1);
    }

    #[test]
    fn test_clock_is_monotonic() {
        let mut clock = FrameClock::new();
        clock.tick(50.0);
        let back = clock.tick(40.0);
        assert_eq!(back.dt, 0.0);
        assert_eq!(back.time, 0.0);
    }

    #[test]
    fn test_tick_draws_every_frame() {
        let mut core = CountingCore { frames: Vec::new() };
        let mut shell = RecordingShell::default();
        let mut render_loop = RenderLoop::new();

        for i in 0..3 {
            render_loop.tick(&mut core, &mut shell, i as f64 * 16.0);
        }

        assert_eq!(shell.draws, 3);
        assert_eq!(core.frames.len(), 3);
        assert_eq!(shell.executed.len(), 1);
        assert_eq!(render_loop.frames(), 3);
    }
}
