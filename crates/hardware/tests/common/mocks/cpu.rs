use std::cell::RefCell;
use std::rc::Rc;

use cachesim_core::soc::packet::Response;
use cachesim_core::soc::traits::ResponsePeer;

#[derive(Default)]
struct CpuLog {
    responses: Vec<Response>,
    retries: usize,
    range_changes: usize,
    refuse_next: usize,
}

/// Requester stand-in that records everything the cache sends it.
///
/// Clones share the log.
#[derive(Clone, Default)]
pub struct RecordingCpu {
    log: Rc<RefCell<CpuLog>>,
}

impl RecordingCpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn responses(&self) -> Vec<Response> {
        self.log.borrow().responses.clone()
    }

    pub fn last_response(&self) -> Option<Response> {
        self.log.borrow().responses.last().cloned()
    }

    pub fn retries(&self) -> usize {
        self.log.borrow().retries
    }

    pub fn range_changes(&self) -> usize {
        self.log.borrow().range_changes
    }

    /// Refuses the next `n` responses.
    pub fn refuse_next(&self, n: usize) {
        self.log.borrow_mut().refuse_next = n;
    }
}

impl ResponsePeer for RecordingCpu {
    fn recv_timing_resp(&mut self, resp: Response) -> Result<(), Response> {
        let mut log = self.log.borrow_mut();
        if log.refuse_next > 0 {
            log.refuse_next -= 1;
            return Err(resp);
        }
        log.responses.push(resp);
        Ok(())
    }

    fn recv_req_retry(&mut self) {
        self.log.borrow_mut().retries += 1;
    }

    fn recv_range_change(&mut self) {
        self.log.borrow_mut().range_changes += 1;
    }
}
