//! In-process enclave double for unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use poet_core::{PoetError, PoetResult};
use serde::{Deserialize, Serialize};

use crate::{EnclaveTimerHandle, PoetEnclave};

pub const MOCK_REQUEST_TIME: f64 = 500.0;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MockTimer {
    previous_certificate_id: String,
    local_mean: f64,
    request_time: f64,
    duration: f64,
    #[serde(skip)]
    signature: String,
}

impl EnclaveTimerHandle for MockTimer {
    fn previous_certificate_id(&self) -> &str {
        &self.previous_certificate_id
    }

    fn local_mean(&self) -> f64 {
        self.local_mean
    }

    fn request_time(&self) -> f64 {
        self.request_time
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn signature(&self) -> &str {
        &self.signature
    }

    fn serialize(&self) -> PoetResult<String> {
        serde_json::to_string(self).map_err(|e| PoetError::enclave_unavailable(e.to_string()))
    }
}

/// Issues timers of a fixed duration and counts enclave calls
pub struct MockEnclave {
    duration: f64,
    available: AtomicBool,
    verify_result: AtomicBool,
    verify_calls: AtomicUsize,
    deserialize_calls: AtomicUsize,
    created: Mutex<Vec<(String, f64)>>,
}

impl MockEnclave {
    pub fn new(duration: f64) -> Self {
        MockEnclave {
            duration,
            available: AtomicBool::new(true),
            verify_result: AtomicBool::new(true),
            verify_calls: AtomicUsize::new(0),
            deserialize_calls: AtomicUsize::new(0),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_verify_result(&self, result: bool) {
        self.verify_result.store(result, Ordering::SeqCst);
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn deserialize_calls(&self) -> usize {
        self.deserialize_calls.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> Vec<(String, f64)> {
        self.created.lock().clone()
    }

    fn check_available(&self) -> PoetResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PoetError::enclave_unavailable("mock enclave offline"))
        }
    }

    fn sign(timer: &MockTimer) -> String {
        format!("sig:{}:{}", timer.previous_certificate_id, timer.duration)
    }
}

impl PoetEnclave for MockEnclave {
    type Timer = MockTimer;

    fn minimum_wait_time(&self) -> f64 {
        1.0
    }

    fn create_wait_timer(&self, previous_certificate_id: &str, local_mean: f64) -> PoetResult<MockTimer> {
        self.check_available()?;
        self.created
            .lock()
            .push((previous_certificate_id.to_string(), local_mean));
        let mut timer = MockTimer {
            previous_certificate_id: previous_certificate_id.to_string(),
            local_mean,
            request_time: MOCK_REQUEST_TIME,
            duration: self.duration,
            signature: String::new(),
        };
        timer.signature = Self::sign(&timer);
        Ok(timer)
    }

    fn deserialize_wait_timer(&self, serialized: &str, signature: &str) -> PoetResult<MockTimer> {
        self.deserialize_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let mut timer: MockTimer = serde_json::from_str(serialized)
            .map_err(|e| PoetError::enclave_unavailable(format!("malformed timer: {e}")))?;
        timer.signature = signature.to_string();
        Ok(timer)
    }

    fn verify_wait_timer(&self, timer: &MockTimer) -> PoetResult<bool> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.verify_result.load(Ordering::SeqCst) && timer.signature == Self::sign(timer))
    }
}
