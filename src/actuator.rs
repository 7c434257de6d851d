// src/actuator.rs
//
// Steering command sinks. Only left/right ever reach a sink; a tick with
// no command sends nothing and the servo holds its position.

use crate::types::{ActuatorConfig, ActuatorKind, SteeringCommand};
use anyhow::{Context, Result};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info};

pub trait ActuatorSink {
    fn name(&self) -> String;

    fn send(&mut self, command: SteeringCommand) -> Result<()>;
}

pub fn from_config(config: &ActuatorConfig) -> Result<Box<dyn ActuatorSink>> {
    Ok(match config.kind {
        ActuatorKind::Log => Box::new(LogActuator::default()),
        ActuatorKind::Serial => Box::new(SerialActuator::open(&config.port, config.baud_rate)?),
    })
}

/// Dry-run sink that only logs.
#[derive(Default)]
pub struct LogActuator {
    sent: u64,
}

impl ActuatorSink for LogActuator {
    fn name(&self) -> String {
        "log".to_string()
    }

    fn send(&mut self, command: SteeringCommand) -> Result<()> {
        self.sent += 1;
        info!(
            "🎯 Servo {:?}{} (#{})",
            command.turn,
            if command.reasserted { " (held)" } else { "" },
            self.sent
        );
        Ok(())
    }
}

/// Writes one symbol per command, newline terminated, to the servo board.
pub struct SerialActuator<W: Write = Box<dyn serialport::SerialPort>> {
    port_name: String,
    port: W,
}

impl SerialActuator {
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(100))
            .open()
            .with_context(|| format!("Failed to open serial port {}", port_name))?;
        info!("Selected port {} @ {} baud", port_name, baud_rate);

        Ok(Self {
            port_name: port_name.to_string(),
            port,
        })
    }
}

#[cfg(test)]
impl<W: Write> SerialActuator<W> {
    pub fn with_writer(port_name: &str, port: W) -> Self {
        Self {
            port_name: port_name.to_string(),
            port,
        }
    }

    pub fn into_inner(self) -> W {
        self.port
    }
}

impl<W: Write> ActuatorSink for SerialActuator<W> {
    fn name(&self) -> String {
        format!("serial:{}", self.port_name)
    }

    fn send(&mut self, command: SteeringCommand) -> Result<()> {
        let buf = [command.wire_symbol(), b'\n'];
        self.port
            .write_all(&buf)
            .with_context(|| format!("Failed to write to {}", self.port_name))?;
        self.port.flush()?;
        debug!("sent: {}", command.wire_symbol() as char);
        Ok(())
    }
}

/// Keeps every command for later inspection.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct RecordingActuator {
    pub sent: std::sync::Arc<std::sync::Mutex<Vec<SteeringCommand>>>,
}

#[cfg(test)]
impl RecordingActuator {
    pub fn commands(&self) -> Vec<SteeringCommand> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl ActuatorSink for RecordingActuator {
    fn name(&self) -> String {
        "recording".to_string()
    }

    fn send(&mut self, command: SteeringCommand) -> Result<()> {
        self.sent.lock().unwrap().push(command);
        Ok(())
    }
}
