// =============================================================================
// Fichier : ports.rs
// Rôle    : Énumération des ports série et surveillance en arrière-plan
// =============================================================================

use std::thread;
use std::time::Duration;

use anyhow::Result;
use serialport::{available_ports, SerialPortType};
use tokio_util::sync::CancellationToken;

use crate::core::worker::Worker;

/// Informations sur un port série disponible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortInfo {
    pub device: String,
    pub manufacturer: String,
    pub description: String,
}

impl SerialPortInfo {
    /// Libellé affiché dans le sélecteur de port.
    pub fn label(&self) -> String {
        match (self.description.is_empty(), self.manufacturer.is_empty()) {
            (true, true) => self.device.clone(),
            (false, true) => format!("{} ({})", self.device, self.description),
            (true, false) => format!("{} [{}]", self.device, self.manufacturer),
            (false, false) => format!(
                "{} ({}) [{}]",
                self.device, self.description, self.manufacturer
            ),
        }
    }
}

/// Liste les ports série disponibles.
pub fn list_serial_ports() -> Vec<SerialPortInfo> {
    match available_ports() {
        Ok(ports) => ports
            .into_iter()
            .map(|p| {
                let (manufacturer, description) = match &p.port_type {
                    SerialPortType::UsbPort(info) => (
                        info.manufacturer.clone().unwrap_or_default(),
                        info.product.clone().unwrap_or_default(),
                    ),
                    _ => (String::new(), String::new()),
                };
                SerialPortInfo {
                    device: p.port_name,
                    manufacturer,
                    description,
                }
            })
            .collect(),
        Err(e) => {
            log::warn!("Impossible d'énumérer les ports série : {e}");
            Vec::new()
        }
    }
}

/// Surveille les ports série et publie la liste à chaque changement.
pub struct PortWatcher {
    interval: Duration,
    tx: async_channel::Sender<Vec<SerialPortInfo>>,
    scan: fn() -> Vec<SerialPortInfo>,
}

impl PortWatcher {
    pub fn new(tx: async_channel::Sender<Vec<SerialPortInfo>>) -> Self {
        Self {
            interval: Duration::from_secs(1),
            tx,
            scan: list_serial_ports,
        }
    }

    #[cfg(test)]
    fn with_scan(
        tx: async_channel::Sender<Vec<SerialPortInfo>>,
        scan: fn() -> Vec<SerialPortInfo>,
    ) -> Self {
        Self {
            interval: Duration::from_millis(10),
            tx,
            scan,
        }
    }
}

impl Worker for PortWatcher {
    fn name(&self) -> &str {
        "ports"
    }

    fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        let step = Duration::from_millis(50).min(self.interval);
        let mut last: Option<Vec<SerialPortInfo>> = None;
        while !cancel.is_cancelled() {
            let ports = (self.scan)();
            if last.as_ref() != Some(&ports) {
                log::debug!("Ports série : {}", ports.len());
                if self.tx.try_send(ports.clone()).is_err() {
                    // Plus personne n'écoute.
                    break;
                }
                last = Some(ports);
            }
            let mut waited = Duration::ZERO;
            while waited < self.interval && !cancel.is_cancelled() {
                thread::sleep(step);
                waited += step;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reporter::ErrorReporter;
    use crate::core::worker::{WorkOutcome, WorkSupervisor};
    use std::time::Instant;

    fn fixed_ports() -> Vec<SerialPortInfo> {
        vec![SerialPortInfo {
            device: "/dev/ttyUSB0".into(),
            manufacturer: "wch.cn".into(),
            description: "USB Serial".into(),
        }]
    }

    #[test]
    fn labels_mention_known_details_only() {
        let mut port = fixed_ports().remove(0);
        assert_eq!(port.label(), "/dev/ttyUSB0 (USB Serial) [wch.cn]");
        port.manufacturer.clear();
        assert_eq!(port.label(), "/dev/ttyUSB0 (USB Serial)");
        port.description.clear();
        assert_eq!(port.label(), "/dev/ttyUSB0");
    }

    #[test]
    fn watcher_publishes_once_per_change_and_stops_on_cancel() {
        let (tx, rx) = async_channel::unbounded();
        let mut sup = WorkSupervisor::new(ErrorReporter::new());
        sup.start(PortWatcher::with_scan(tx, fixed_ports), false).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while rx.is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        thread::sleep(Duration::from_millis(50));
        assert_eq!(rx.try_recv().unwrap(), fixed_ports());
        assert!(rx.try_recv().is_err());

        assert_eq!(sup.stop::<PortWatcher>(), 1);
        let mut done = Vec::new();
        while done.is_empty() && Instant::now() < deadline {
            done = sup.poll_completed();
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(done[0].outcome, WorkOutcome::Cancelled);
    }
}
