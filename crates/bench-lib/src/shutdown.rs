//! Shutdown signal shared by the experiment's tasks

use tokio::sync::broadcast;

/// Listens for the experiment-wide shutdown broadcast.
///
/// A dropped sender is not a shutdown: tasks keep running until their own
/// deadline in that case.
#[derive(Debug)]
pub struct Shutdown {
    triggered: bool,
    rx: broadcast::Receiver<()>,
}

impl Shutdown {
    pub fn new(rx: broadcast::Receiver<()>) -> Self {
        Self {
            triggered: false,
            rx,
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Record a shutdown that was broadcast while nobody was waiting
    pub fn check(&mut self) -> bool {
        if !self.triggered {
            use broadcast::error::TryRecvError;
            if let Ok(()) | Err(TryRecvError::Lagged(_)) = self.rx.try_recv() {
                self.triggered = true;
            }
        }
        self.triggered
    }

    /// Wait until shutdown is requested
    pub async fn recv(&mut self) {
        if self.triggered {
            return;
        }

        loop {
            match self.rx.recv().await {
                Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => break,
                Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
            }
        }

        self.triggered = true;
    }
}
