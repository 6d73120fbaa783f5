/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Route steps a traveller covers per tick unless given its own speed.
    pub default_speed: f64,
    /// Maximum event log size (oldest events dropped when exceeded). 0 = unlimited.
    pub max_events: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            default_speed: 0.25,
            max_events: 0,
        }
    }
}

impl SimConfig {
    /// Set the default travel speed in route steps per tick.
    pub fn with_default_speed(mut self, speed: f64) -> Self {
        self.default_speed = speed;
        self
    }

    /// Set the maximum event log size (0 = unlimited).
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = SimConfig::default();
        assert!((config.default_speed - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.max_events, 0);
    }

    #[test]
    fn config_builder_chain() {
        let config = SimConfig::default()
            .with_default_speed(0.5)
            .with_max_events(500);
        assert!((config.default_speed - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.max_events, 500);
    }
}
