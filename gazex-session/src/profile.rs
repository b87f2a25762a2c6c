//! Device configuration profiles.
//!
//! The command block pushed at session start depends on the tracker's
//! hardware generation and, on the third generation, on its software
//! revision. Resolution is a pure function of those inputs plus the screen
//! geometry, so every branch is testable without hardware.

use gazex_core::{Rgb, ScreenRect, TargetSounds};

const CL_MARKER: &str = "EYELINK CL";

/// One entry of the setup block, in the order it must reach the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupStep {
    Command(String),
    Message(String),
}

/// Calibration target look and feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationAppearance {
    pub foreground: Rgb,
    pub background: Rgb,
    pub target_outer: u32,
    pub target_inner: u32,
    pub calibration_sounds: TargetSounds,
    pub drift_sounds: TargetSounds,
}

impl CalibrationAppearance {
    pub fn for_screen(screen: ScreenRect) -> Self {
        Self {
            foreground: Rgb::BLACK,
            background: Rgb::WHITE,
            target_outer: screen.width / 70,
            target_inner: screen.width / 300,
            calibration_sounds: TargetSounds::off(),
            drift_sounds: TargetSounds::off(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerProfile {
    pub generation: u32,
    pub software_version: u32,
    pub steps: Vec<SetupStep>,
    pub appearance: CalibrationAppearance,
}

impl TrackerProfile {
    /// Builds the setup block for a tracker of `generation` reporting
    /// `version_string` (only consulted for generation 3).
    pub fn resolve(generation: u32, version_string: Option<&str>, screen: ScreenRect) -> Self {
        let software_version = if generation == 3 {
            version_string.map(parse_software_version).unwrap_or(0)
        } else {
            0
        };

        let mut steps = Vec::with_capacity(12);
        let cmd = |s: &str| SetupStep::Command(s.to_string());

        if generation >= 2 {
            steps.push(cmd("select_parser_configuration 0"));
            if generation == 2 {
                steps.push(cmd("scene_camera_gazemap = NO"));
            } else {
                steps.push(cmd("saccade_velocity_threshold = 35"));
                steps.push(cmd("saccade_acceleration_threshold = 9500"));
            }
        }

        let htarget = software_version >= 4;
        steps.push(cmd(
            "file_event_filter = LEFT,RIGHT,FIXATION,SACCADE,BLINK,MESSAGE,BUTTON",
        ));
        steps.push(cmd(if htarget {
            "file_sample_data = LEFT,RIGHT,GAZE,AREA,GAZERES,STATUS,HTARGET"
        } else {
            "file_sample_data = LEFT,RIGHT,GAZE,AREA,GAZERES,STATUS"
        }));
        steps.push(cmd(
            "link_event_filter = LEFT,RIGHT,FIXATION,SACCADE,BLINK,BUTTON",
        ));
        steps.push(cmd(if htarget {
            "link_sample_data = LEFT,RIGHT,GAZE,GAZERES,AREA,STATUS,HTARGET"
        } else {
            "link_sample_data = LEFT,RIGHT,GAZE,GAZERES,AREA,STATUS"
        }));
        steps.push(cmd("button_function 5 'accept_target_fixation'"));

        Self {
            generation,
            software_version,
            steps,
            appearance: CalibrationAppearance::for_screen(screen),
        }
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|s| match s {
            SetupStep::Command(c) => Some(c.as_str()),
            SetupStep::Message(_) => None,
        })
    }
}

/// Geometry steps sent before the generation query: the device command and
/// the matching trace message.
pub fn geometry_steps(screen: ScreenRect) -> [SetupStep; 2] {
    [
        SetupStep::Command(format!(
            "screen_pixel_coords =  0 0 {} {}",
            screen.width, screen.height
        )),
        SetupStep::Message(format!(
            "DISPLAY_COORDS  0 0 {} {}",
            screen.width, screen.height
        )),
    ]
}

/// Major software revision from a version string such as
/// `EYELINK CL 4.56`. Anything unparsable is revision 0.
pub fn parse_software_version(version_string: &str) -> u32 {
    let Some(idx) = version_string.find(CL_MARKER) else {
        log::warn!("unrecognised tracker version string {:?}", version_string);
        return 0;
    };
    let tail = version_string[idx + CL_MARKER.len()..].trim();
    let number = tail.split_whitespace().next().unwrap_or("");
    match number.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => v.trunc() as u32,
        _ => {
            log::warn!("unparsable tracker software version {:?}", tail);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: ScreenRect = ScreenRect {
        width: 1280,
        height: 1024,
    };

    fn commands(p: &TrackerProfile) -> Vec<&str> {
        p.commands().collect()
    }

    #[test]
    fn parses_cl_versions() {
        assert_eq!(parse_software_version("EYELINK CL 4.56  "), 4);
        assert_eq!(parse_software_version("EYELINK CL 3.0"), 3);
        assert_eq!(parse_software_version("EYELINK CL 5"), 5);
        assert_eq!(parse_software_version("EYELINK II 2.1"), 0);
        assert_eq!(parse_software_version("EYELINK CL beta"), 0);
        assert_eq!(parse_software_version(""), 0);
    }

    #[test]
    fn first_generation_gets_base_block_only() {
        let p = TrackerProfile::resolve(1, None, SCREEN);
        assert_eq!(p.software_version, 0);
        assert_eq!(
            commands(&p),
            vec![
                "file_event_filter = LEFT,RIGHT,FIXATION,SACCADE,BLINK,MESSAGE,BUTTON",
                "file_sample_data = LEFT,RIGHT,GAZE,AREA,GAZERES,STATUS",
                "link_event_filter = LEFT,RIGHT,FIXATION,SACCADE,BLINK,BUTTON",
                "link_sample_data = LEFT,RIGHT,GAZE,GAZERES,AREA,STATUS",
                "button_function 5 'accept_target_fixation'",
            ]
        );
    }

    #[test]
    fn second_generation_disables_scene_camera() {
        let p = TrackerProfile::resolve(2, Some("EYELINK CL 4.5"), SCREEN);
        // Version string ignored below generation 3.
        assert_eq!(p.software_version, 0);
        let c = commands(&p);
        assert_eq!(c[0], "select_parser_configuration 0");
        assert_eq!(c[1], "scene_camera_gazemap = NO");
        assert!(!c.iter().any(|s| s.starts_with("saccade_")));
        assert!(!c.iter().any(|s| s.contains("HTARGET")));
    }

    #[test]
    fn modern_cl_sets_saccade_thresholds_and_htarget() {
        let p = TrackerProfile::resolve(3, Some("EYELINK CL 4.56"), SCREEN);
        assert_eq!(p.software_version, 4);
        let c = commands(&p);
        assert_eq!(
            &c[..3],
            &[
                "select_parser_configuration 0",
                "saccade_velocity_threshold = 35",
                "saccade_acceleration_threshold = 9500",
            ]
        );
        assert!(c.contains(&"file_sample_data = LEFT,RIGHT,GAZE,AREA,GAZERES,STATUS,HTARGET"));
        assert!(c.contains(&"link_sample_data = LEFT,RIGHT,GAZE,GAZERES,AREA,STATUS,HTARGET"));
        assert_eq!(c.last(), Some(&"button_function 5 'accept_target_fixation'"));
    }

    #[test]
    fn old_cl_firmware_has_no_htarget() {
        let p = TrackerProfile::resolve(3, Some("EYELINK CL 3.99"), SCREEN);
        assert_eq!(p.software_version, 3);
        assert!(!commands(&p).iter().any(|s| s.contains("HTARGET")));
    }

    #[test]
    fn appearance_scales_with_width() {
        let p = TrackerProfile::resolve(3, None, SCREEN);
        assert_eq!(p.appearance.target_outer, 18);
        assert_eq!(p.appearance.target_inner, 4);
        assert_eq!(p.appearance.foreground, Rgb::BLACK);
        assert_eq!(p.appearance.background, Rgb::WHITE);
        assert_eq!(p.appearance.calibration_sounds, TargetSounds::off());
    }

    #[test]
    fn geometry_is_command_then_message() {
        let [cmd, msg] = geometry_steps(SCREEN);
        assert_eq!(cmd, SetupStep::Command("screen_pixel_coords =  0 0 1280 1024".into()));
        assert_eq!(msg, SetupStep::Message("DISPLAY_COORDS  0 0 1280 1024".into()));
    }
}
