use indicator_core::buttons::InputLevel;
use indicator_core::clock::TickInstant;
use indicator_core::events::EventRecorder;
use indicator_core::machine::{ChargeController, IndicatorDriver};
use indicator_core::stages::{
    ALL_STAGES, FULL_CHARGE_MILLIS, STAGE_COUNT, StageId, StatusColor, TERMINAL_BLINK_MILLIS,
};

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "press",
        "press <start|stop>      - hold a button down from now on",
    ),
    (
        "release",
        "release <start|stop>    - let a button back up",
    ),
    (
        "tick",
        "tick <millis>           - advance the simulated clock, polling every 1 ms",
    ),
    (
        "status",
        "status                  - display the panel and controller state",
    ),
    (
        "events",
        "events                  - dump the recorded event trail",
    ),
    (
        "demo",
        "demo <charge|abort>     - run a scripted cycle from the current instant",
    ),
    (
        "help",
        "help [topic]            - show help for a command",
    ),
];

/// Emulated panel: remembers the last level written to every output.
pub struct PanelModel {
    stages: [bool; STAGE_COUNT],
    status: StatusColor,
}

impl Default for PanelModel {
    fn default() -> Self {
        Self {
            stages: [false; STAGE_COUNT],
            status: StatusColor::Ready,
        }
    }
}

impl PanelModel {
    fn render_stages(&self) -> String {
        let mut bar = String::with_capacity(STAGE_COUNT);
        for lit in self.stages {
            bar.push(if lit { '#' } else { '-' });
        }
        bar
    }
}

impl IndicatorDriver for PanelModel {
    fn set_stage(&mut self, stage: StageId, lit: bool) {
        self.stages[stage.as_index()] = lit;
    }

    fn set_all_stages(&mut self, lit: bool) {
        self.stages = [lit; STAGE_COUNT];
    }

    fn set_status(&mut self, color: StatusColor) {
        self.status = color;
    }
}

pub struct Session {
    controller: ChargeController<TickInstant, PanelModel>,
    events: EventRecorder<TickInstant, 64>,
    now_millis: u64,
    start_level: InputLevel,
    stop_level: InputLevel,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self {
            controller: ChargeController::with_driver(PanelModel::default()),
            events: EventRecorder::new(),
            now_millis: 0,
            start_level: InputLevel::High,
            stop_level: InputLevel::High,
        }
    }

    pub fn handle_command(&mut self, line: &str) -> Vec<String> {
        let trimmed = line.trim();
        let mut words = trimmed.split_whitespace();
        let Some(verb) = words.next() else {
            return Vec::new();
        };
        let argument = words.next();
        if words.next().is_some() {
            return vec![format!("ERR syntax: too many arguments for `{verb}`")];
        }

        if verb.eq_ignore_ascii_case("press") {
            self.handle_level(argument, InputLevel::Low)
        } else if verb.eq_ignore_ascii_case("release") {
            self.handle_level(argument, InputLevel::High)
        } else if verb.eq_ignore_ascii_case("tick") {
            self.handle_tick(argument)
        } else if verb.eq_ignore_ascii_case("status") {
            self.render_status()
        } else if verb.eq_ignore_ascii_case("events") {
            self.render_events()
        } else if verb.eq_ignore_ascii_case("demo") {
            self.handle_demo(argument)
        } else if verb.eq_ignore_ascii_case("help") {
            Self::render_help(argument)
        } else {
            vec![format!(
                "ERR unknown command `{verb}` (try `help`)"
            )]
        }
    }

    fn handle_level(&mut self, argument: Option<&str>, level: InputLevel) -> Vec<String> {
        let held = level == InputLevel::Low;
        let action = if held { "pressed" } else { "released" };
        match argument {
            Some(name) if name.eq_ignore_ascii_case("start") => {
                self.start_level = level;
                vec![format!("start button {action}")]
            }
            Some(name) if name.eq_ignore_ascii_case("stop") => {
                self.stop_level = level;
                vec![format!("stop button {action}")]
            }
            _ => vec!["ERR syntax: expected `start` or `stop`".to_string()],
        }
    }

    fn handle_tick(&mut self, argument: Option<&str>) -> Vec<String> {
        let Some(millis) = argument.and_then(|raw| raw.parse::<u64>().ok()) else {
            return vec!["ERR syntax: expected `tick <millis>`".to_string()];
        };

        let before = self.controller.phase();
        let mut transitions = Vec::new();
        for _ in 0..millis {
            self.now_millis += 1;
            let phase_was = self.controller.phase();
            self.controller.poll(
                self.start_level,
                self.stop_level,
                TickInstant::from_millis(self.now_millis),
                &mut self.events,
            );
            let phase_now = self.controller.phase();
            if phase_now != phase_was {
                transitions.push(format!(
                    "t={}ms {phase_was} -> {phase_now}",
                    self.now_millis
                ));
            }
        }

        let mut lines = vec![format!(
            "advanced {millis}ms to t={}ms (phase {} -> {})",
            self.now_millis,
            before,
            self.controller.phase()
        )];
        lines.extend(transitions);
        lines
    }

    fn handle_demo(&mut self, argument: Option<&str>) -> Vec<String> {
        match argument {
            Some(name) if name.eq_ignore_ascii_case("charge") => {
                // Tap start, then let the full cycle and terminal blink play out.
                let mut lines = self.scripted_press(ButtonScript::Start, 200);
                let run = FULL_CHARGE_MILLIS + TERMINAL_BLINK_MILLIS;
                lines.extend(self.handle_tick(Some(&run.to_string())));
                lines
            }
            Some(name) if name.eq_ignore_ascii_case("abort") => {
                // Start charging, then hold stop past the 1 s threshold.
                let mut lines = self.scripted_press(ButtonScript::Start, 200);
                lines.extend(self.handle_tick(Some("2000")));
                lines.extend(self.scripted_press(ButtonScript::Stop, 1_100));
                let settle = TERMINAL_BLINK_MILLIS;
                lines.extend(self.handle_tick(Some(&settle.to_string())));
                lines
            }
            _ => vec!["ERR syntax: expected `demo charge` or `demo abort`".to_string()],
        }
    }

    fn scripted_press(&mut self, button: ButtonScript, hold_millis: u64) -> Vec<String> {
        let (press, release) = match button {
            ButtonScript::Start => ("start", "start"),
            ButtonScript::Stop => ("stop", "stop"),
        };
        let mut lines = self.handle_level(Some(press), InputLevel::Low);
        lines.extend(self.handle_tick(Some(&hold_millis.to_string())));
        lines.extend(self.handle_level(Some(release), InputLevel::High));
        lines.extend(self.handle_tick(Some("60")));
        lines
    }

    fn render_status(&self) -> Vec<String> {
        let panel = self.controller.driver();
        let mut lines = vec![
            format!(
                "t={}ms phase={} forced={}",
                self.now_millis,
                self.controller.phase(),
                self.controller.forced()
            ),
            format!(
                "stages [{}] next-index={}",
                panel.render_stages(),
                self.controller.stage_index()
            ),
            format!("status LED: {}", panel.status),
        ];
        for (line, lit) in ALL_STAGES.iter().zip(panel.stages) {
            lines.push(format!(
                "  {} pin={} {}",
                line.name,
                line.mcu_pin,
                if lit { "on" } else { "off" }
            ));
        }
        lines
    }

    fn render_events(&self) -> Vec<String> {
        if self.events.is_empty() {
            return vec!["no events recorded".to_string()];
        }
        self.events
            .oldest_first()
            .map(|record| {
                let gap = record
                    .since_previous
                    .map_or_else(String::new, |gap| format!(" (+{}ms)", gap.as_millis()));
                format!(
                    "#{:03} t={}ms {}{gap}",
                    record.id,
                    record.timestamp.as_millis(),
                    record.event
                )
            })
            .collect()
    }

    fn render_help(topic: Option<&str>) -> Vec<String> {
        match topic {
            Some(target) if !target.is_empty() => {
                if let Some((_, detail)) = HELP_TOPICS
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(target))
                {
                    vec![(*detail).to_string()]
                } else {
                    vec![
                        format!("No help available for `{target}`."),
                        format!(
                            "Available topics: {}",
                            HELP_TOPICS
                                .iter()
                                .map(|(name, _)| *name)
                                .collect::<Vec<_>>()
                                .join(", ")
                        ),
                    ]
                }
            }
            _ => {
                let mut lines = vec!["Available commands:".to_string()];
                for (_, detail) in HELP_TOPICS {
                    lines.push(format!("  {detail}"));
                }
                lines.push("Type `help <topic>` for a specific command.".to_string());
                lines
            }
        }
    }
}

#[derive(Copy, Clone)]
enum ButtonScript {
    Start,
    Stop,
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicator_core::machine::Phase;

    fn run(session: &mut Session, commands: &[&str]) -> Vec<String> {
        let mut output = Vec::new();
        for command in commands {
            output.extend(session.handle_command(command));
        }
        output
    }

    #[test]
    fn press_and_tick_start_a_charge() {
        let mut session = Session::new();
        run(&mut session, &["press start", "tick 60"]);
        assert_eq!(session.controller.phase(), Phase::Charging);

        let status = session.handle_command("status");
        assert!(status[0].contains("phase=charging"));
    }

    #[test]
    fn demo_charge_settles_back_to_idle() {
        let mut session = Session::new();
        let output = session.handle_command("demo charge");
        assert_eq!(session.controller.phase(), Phase::Idle);
        assert!(!session.controller.forced());
        assert!(output.iter().any(|line| line.contains("-> terminal-blink")));
        assert!(output.iter().any(|line| line.contains("-> idle")));

        let events = session.handle_command("events");
        assert!(events.first().is_some_and(|line| line.contains("charge-started")));
        assert!(events.last().is_some_and(|line| line.contains("returned-to-idle")));
        assert_eq!(
            events
                .iter()
                .filter(|line| line.contains("stage-latched"))
                .count(),
            STAGE_COUNT
        );
    }

    #[test]
    fn demo_abort_records_a_forced_stop() {
        let mut session = Session::new();
        let output = session.handle_command("demo abort");
        assert_eq!(session.controller.phase(), Phase::Idle);
        assert!(output.iter().any(|line| line.contains("-> terminal-blink")));

        let events = session.handle_command("events");
        assert!(events.iter().any(|line| line.contains("forced-stop")));
        assert!(!events.iter().any(|line| line.contains("charge-complete")));
    }

    #[test]
    fn unknown_commands_and_bad_arguments_error_out() {
        let mut session = Session::new();
        assert!(session.handle_command("frobnicate")[0].starts_with("ERR unknown"));
        assert!(session.handle_command("press middle")[0].starts_with("ERR syntax"));
        assert!(session.handle_command("tick soon")[0].starts_with("ERR syntax"));
        assert!(session.handle_command("tick 5 7")[0].starts_with("ERR syntax"));
    }

    #[test]
    fn help_lists_every_topic() {
        let output = Session::render_help(None);
        for (name, _) in HELP_TOPICS {
            assert!(
                output.iter().any(|line| line.contains(name)),
                "missing topic {name}"
            );
        }
        assert_eq!(Session::render_help(Some("tick")).len(), 1);
    }
}
