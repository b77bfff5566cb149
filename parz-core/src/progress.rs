use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc, Mutex, PoisonError,
};
use std::thread;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(250);
const REPORT_EVERY: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct Progress {
    enabled: bool,
    pub stage: Arc<Mutex<String>>,
    pub chunks_done: Arc<AtomicUsize>,
    pub chunks_total: Arc<AtomicUsize>,
    pub bytes_done: Arc<AtomicU64>,
    pub bytes_total: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            stage: Arc::new(Mutex::new(String::new())),
            chunks_done: Arc::new(AtomicUsize::new(0)),
            chunks_total: Arc::new(AtomicUsize::new(0)),
            bytes_done: Arc::new(AtomicU64::new(0)),
            bytes_total: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }
    pub fn set_stage(&self, s: &str) {
        if self.enabled {
            *self.stage.lock().unwrap_or_else(PoisonError::into_inner) = s.to_string();
        }
    }
    pub fn set_chunks_total(&self, n: usize) {
        self.chunks_total.store(n, Ordering::Relaxed);
    }
    pub fn inc_chunk(&self) {
        self.chunks_done.fetch_add(1, Ordering::Relaxed);
    }
    pub fn reset_bytes(&self, total: u64) {
        self.bytes_total.store(total, Ordering::Relaxed);
        self.bytes_done.store(0, Ordering::Relaxed);
    }
    pub fn add_bytes(&self, n: u64) {
        self.bytes_done.fetch_add(n, Ordering::Relaxed);
    }

    pub fn start(&self) {
        if !self.enabled {
            return;
        }
        self.running.store(true, Ordering::Relaxed);
        let this = self.clone();
        thread::spawn(move || {
            let t0 = Instant::now();
            let mut last = Instant::now();
            while this.running.load(Ordering::Relaxed) {
                thread::sleep(TICK);
                if !this.running.load(Ordering::Relaxed) {
                    break;
                }
                if last.elapsed() >= REPORT_EVERY {
                    last = Instant::now();
                    eprintln!("[{:>4}s] {}", t0.elapsed().as_secs(), this.line());
                }
            }
        });
    }
    pub fn stop(&self) {
        if self.enabled && self.running.swap(false, Ordering::Relaxed) {
            eprintln!("{}", self.line());
        }
    }

    fn line(&self) -> String {
        let s = self.stage.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let cd = self.chunks_done.load(Ordering::Relaxed);
        let ct = self.chunks_total.load(Ordering::Relaxed);
        let bd = self.bytes_done.load(Ordering::Relaxed);
        let bt = self.bytes_total.load(Ordering::Relaxed);
        let pct = if bt > 0 { (bd as f64 / bt as f64) * 100.0 } else { 0.0 };
        format!("{} | chunks {}/{} | input {}%", s, cd, ct, pct.min(100.0) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let p = Progress::new(false);
        p.set_chunks_total(3);
        p.reset_bytes(300);
        p.inc_chunk();
        p.add_bytes(100);
        assert_eq!(p.chunks_done.load(Ordering::Relaxed), 1);
        assert_eq!(p.line(), " | chunks 1/3 | input 33%");
    }
}
