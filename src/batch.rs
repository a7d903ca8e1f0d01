use std::io;
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, debug_span, warn};

use smt_core::{translate, DecodeError, ModelGenerator, SourceSentence, Translation};

// ---------------------------------------------------------------------------
// Work / Result types
// ---------------------------------------------------------------------------

struct DecodeWork {
    index: usize,
    sentence: SourceSentence,
    reply: mpsc::Sender<DecodeResult>,
}

struct DecodeResult {
    index: usize,
    result: Result<Translation, DecodeError>,
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("decode workers stopped with {missing} sentences unanswered")]
    WorkersGone { missing: usize },
}

// ---------------------------------------------------------------------------
// BatchTranslator
// ---------------------------------------------------------------------------

/// Decodes sentences on a fixed pool of named worker threads.
///
/// Each sentence gets its own `SentenceModel` on the worker that picks it
/// up; only the `ModelGenerator` is shared. A failed sentence yields its
/// own error and does not affect the others.
pub struct BatchTranslator {
    work_tx: Option<mpsc::Sender<DecodeWork>>,
    workers: Vec<JoinHandle<()>>,
}

impl BatchTranslator {
    pub fn new(gen: Arc<ModelGenerator>, threads: usize) -> io::Result<Self> {
        let (work_tx, work_rx) = mpsc::channel::<DecodeWork>();
        let work_rx = Arc::new(Mutex::new(work_rx));
        let workers = (0..threads.max(1))
            .map(|i| {
                let gen = Arc::clone(&gen);
                let rx = Arc::clone(&work_rx);
                thread::Builder::new()
                    .name(format!("smt-decode-{i}"))
                    .spawn(move || decode_worker(&rx, &gen))
            })
            .collect::<io::Result<Vec<_>>>()?;
        debug!(threads = workers.len(), "batch translator started");
        Ok(Self {
            work_tx: Some(work_tx),
            workers,
        })
    }

    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Translates every sentence; results come back in input order.
    pub fn translate_all(
        &self,
        sentences: Vec<SourceSentence>,
    ) -> Result<Vec<Result<Translation, DecodeError>>, BatchError> {
        let n = sentences.len();
        let (reply_tx, reply_rx) = mpsc::channel::<DecodeResult>();
        let gone = || BatchError::WorkersGone { missing: n };
        let work_tx = self.work_tx.as_ref().ok_or_else(gone)?;
        for (index, sentence) in sentences.into_iter().enumerate() {
            work_tx
                .send(DecodeWork {
                    index,
                    sentence,
                    reply: reply_tx.clone(),
                })
                .map_err(|_| gone())?;
        }
        drop(reply_tx);

        let mut slots: Vec<Option<Result<Translation, DecodeError>>> = (0..n).map(|_| None).collect();
        for done in reply_rx.iter().take(n) {
            slots[done.index] = Some(done.result);
        }
        let missing = slots.iter().filter(|s| s.is_none()).count();
        if missing > 0 {
            return Err(BatchError::WorkersGone { missing });
        }
        Ok(slots.into_iter().flatten().collect())
    }
}

impl Drop for BatchTranslator {
    fn drop(&mut self) {
        // closing the channel ends every worker loop
        self.work_tx.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("decode worker panicked");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Worker threads
// ---------------------------------------------------------------------------

fn decode_worker(rx: &Mutex<mpsc::Receiver<DecodeWork>>, gen: &ModelGenerator) {
    loop {
        let work = {
            let Ok(guard) = rx.lock() else {
                return;
            };
            match guard.recv() {
                Ok(work) => work,
                Err(_) => return,
            }
        };
        let _span = debug_span!("sentence", index = work.index, len = work.sentence.len()).entered();
        let result = translate(gen, &work.sentence);
        if let Err(e) = &result {
            debug!(error = %e, "sentence failed");
        }
        let _ = work.reply.send(DecodeResult {
            index: work.index,
            result,
        });
    }
}
