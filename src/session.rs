use crate::config::SessionPlan;
use crate::error::{Error, Result};
use crate::prompt;
use crate::runtime::{InputProducer, Token, TokenEvent, TokenSource};
use crate::stats::{IntervalReport, Report, ReportSink, SessionEnd, SessionReport};
use chrono::{DateTime, Local};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    AwaitingStart,
    /// Zero-based interval currently being collected
    RunningInterval { index: usize },
    Terminated(SessionEnd),
}

/// What ended a wait inside an interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    StopWord,
    IntervalExpired,
    SessionExpired,
}

/// Bytes typed since the last interval boundary and since session start
#[derive(Debug, Default, Clone)]
pub struct SessionBuffers {
    interval: Vec<u8>,
    session: Vec<u8>,
}

impl SessionBuffers {
    pub fn push(&mut self, token: &Token) {
        self.interval.extend_from_slice(token.as_bytes());
        self.session.extend_from_slice(token.as_bytes());
    }

    pub fn reset_interval(&mut self) {
        self.interval.clear();
    }

    pub fn interval(&self) -> &[u8] {
        &self.interval
    }

    pub fn session(&self) -> &[u8] {
        &self.session
    }
}

#[derive(Debug, Clone, Copy)]
struct Clock {
    started: Instant,
    started_at: DateTime<Local>,
}

/// Drives one session: owns both timers and both buffers and decides when to
/// report.
pub struct SessionScheduler<K: ReportSink> {
    plan: SessionPlan,
    sink: K,
    state: SchedulerState,
    buffers: SessionBuffers,
    clock: Option<Clock>,
}

impl<K: ReportSink> SessionScheduler<K> {
    pub fn new(plan: SessionPlan, sink: K) -> Self {
        Self {
            plan,
            sink,
            state: SchedulerState::AwaitingStart,
            buffers: SessionBuffers::default(),
            clock: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn buffers(&self) -> &SessionBuffers {
        &self.buffers
    }

    pub fn plan(&self) -> &SessionPlan {
        &self.plan
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Run the start prompt, then start the session clock
    pub fn await_start<R: BufRead, W: Write>(&mut self, input: &mut R, out: &mut W) -> Result<()> {
        prompt::await_start(input, out)?;
        self.begin();
        Ok(())
    }

    /// AwaitingStart -> RunningInterval; a no-op in any other state
    pub fn begin(&mut self) {
        if self.state != SchedulerState::AwaitingStart {
            return;
        }
        self.clock = Some(Clock {
            started: Instant::now(),
            started_at: Local::now(),
        });
        self.state = SchedulerState::RunningInterval { index: 0 };
        info!(
            interval = ?self.plan.interval(),
            session = ?self.plan.session(),
            repetitions = self.plan.repetitions(),
            "session started"
        );
    }

    /// Run intervals until the session ends or input fails.
    pub fn run<S: TokenSource>(&mut self, source: &S) -> Result<SessionEnd> {
        let clock = self
            .clock
            .ok_or_else(|| Error::invalid("session has not been started"))?;
        let session_deadline = clock.started + self.plan.session();
        let last = self.plan.repetitions().saturating_sub(1);

        loop {
            let index = match self.state {
                SchedulerState::RunningInterval { index } => index,
                SchedulerState::Terminated(end) => return Ok(end),
                SchedulerState::AwaitingStart => {
                    return Err(Error::invalid("session has not been started"))
                }
            };

            self.buffers.reset_interval();
            let interval_deadline = Instant::now() + self.plan.interval();
            info!(interval = index + 1, "Interval start");

            let boundary = self.wait_for_boundary(source, interval_deadline, session_deadline)?;
            let elapsed = clock.started.elapsed().as_secs_f64();

            self.state = match boundary {
                Boundary::StopWord => {
                    info!("Terminating session preemptively.");
                    self.report_interval(index, elapsed)?;
                    self.report_session(clock, elapsed, SessionEnd::StopWord)?;
                    SchedulerState::Terminated(SessionEnd::StopWord)
                }
                Boundary::IntervalExpired | Boundary::SessionExpired => {
                    info!(interval = index + 1, "Interval end");
                    self.report_interval(index, elapsed)?;
                    if index >= last || boundary == Boundary::SessionExpired {
                        self.report_session(clock, elapsed, SessionEnd::Elapsed)?;
                        SchedulerState::Terminated(SessionEnd::Elapsed)
                    } else {
                        SchedulerState::RunningInterval { index: index + 1 }
                    }
                }
            };
        }
    }

    /// Accumulate tokens until a timer expires or the stop word shows up.
    ///
    /// Expired timers are checked before the queue, so a steady stream of input
    /// cannot hold a boundary back; between the two timers the session wins.
    fn wait_for_boundary<S: TokenSource>(
        &mut self,
        source: &S,
        interval_deadline: Instant,
        session_deadline: Instant,
    ) -> Result<Boundary> {
        loop {
            let now = Instant::now();
            if now >= session_deadline {
                return Ok(Boundary::SessionExpired);
            }
            if now >= interval_deadline {
                return Ok(Boundary::IntervalExpired);
            }

            let wait = interval_deadline.min(session_deadline) - now;
            match source.recv_timeout(wait) {
                Ok(TokenEvent::Token(token)) => {
                    self.buffers.push(&token);
                    if token.contains(self.plan.stop_word()) {
                        debug!(len = token.as_bytes().len(), "stop word received");
                        return Ok(Boundary::StopWord);
                    }
                }
                Ok(TokenEvent::Failed(e)) => return Err(Error::StreamFailure(e)),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::StreamFailure(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "input producer disconnected",
                    )))
                }
            }
        }
    }

    fn report_interval(&mut self, index: usize, elapsed: f64) -> Result<()> {
        let report = IntervalReport::new(
            index + 1,
            self.buffers.interval(),
            self.buffers.session(),
            elapsed,
            self.plan.top_n(),
        );
        self.sink.publish(Report::Interval(report))
    }

    fn report_session(&mut self, clock: Clock, elapsed: f64, ended_by: SessionEnd) -> Result<()> {
        let report = SessionReport::new(
            clock.started_at,
            self.buffers.session(),
            elapsed,
            self.plan.top_n(),
            ended_by,
        );
        self.sink.publish(Report::Session(report))
    }
}

/// Prompt for `start` on `input`, then collect tokens from the rest of `input` on a
/// producer thread until the session ends. Returns how it ended and the sink.
pub fn run_session<R, W, K>(
    plan: SessionPlan,
    mut input: R,
    out: &mut W,
    sink: K,
) -> Result<(SessionEnd, K)>
where
    R: BufRead + Send + 'static,
    W: Write,
    K: ReportSink,
{
    let mut scheduler = SessionScheduler::new(plan, sink);
    scheduler.await_start(&mut input, out)?;

    let producer = InputProducer::spawn(input).map_err(Error::StreamFailure)?;
    let result = scheduler.run(&producer);
    producer.shutdown();

    let end = result?;
    Ok((end, scheduler.into_sink()))
}
