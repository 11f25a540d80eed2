use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::aggregate::PairKey;
use crate::api::ApiClient;
use crate::config::Config;
use crate::push;
use crate::state::{ChannelStatus, Delta, FeedSource, ProviderCommand};

const TICK: Duration = Duration::from_millis(250);

/// Owns the producer threads. Dropping the handle without calling
/// [`FeedHandle::shutdown`] leaves them to exit once the receiver is gone.
pub struct FeedHandle {
    cmd_tx: Option<Sender<ProviderCommand>>,
    stop: Arc<AtomicBool>,
    threads: Vec<thread::JoinHandle<()>>,
}

impl FeedHandle {
    pub fn send(&self, cmd: ProviderCommand) -> bool {
        self.cmd_tx
            .as_ref()
            .is_some_and(|tx| tx.send(cmd).is_ok())
    }

    /// Signal every producer to stop and wait for them.
    pub fn shutdown(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.cmd_tx = None;
        for handle in self.threads.drain(..) {
            let name = handle.thread().name().unwrap_or("feed").to_string();
            if handle.join().is_err() {
                warn!(thread = %name, "producer thread panicked");
            }
        }
        info!("feed stopped");
    }
}

pub fn spawn_feed(config: &Config, tx: Sender<Delta>) -> FeedHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let stop = Arc::new(AtomicBool::new(false));
    let mut threads = Vec::with_capacity(2);

    let api = ApiClient::new(config.api_base.clone());
    let poll_interval = config.poll_interval;
    {
        let poller_tx = tx.clone();
        let poller_stop = stop.clone();
        let spawned = thread::Builder::new()
            .name("snapshot-poller".to_string())
            .spawn(move || run_poller(api, poll_interval, poller_tx, cmd_rx, poller_stop));
        match spawned {
            Ok(handle) => threads.push(handle),
            Err(err) => {
                warn!(%err, "failed to spawn snapshot poller");
                let _ = tx.send(Delta::Log(format!("[WARN] Poller did not start: {err}")));
            }
        }
    }

    if config.push_enabled {
        threads.push(push::spawn_push_channel(
            config.ws_url.clone(),
            config.reconnect,
            tx,
            stop.clone(),
        ));
    } else {
        let _ = tx.send(Delta::Channel(ChannelStatus::Disabled));
    }

    FeedHandle {
        cmd_tx: Some(cmd_tx),
        stop,
        threads,
    }
}

/// Wraps externally spawned producers (the demo feed) so the binary can stop
/// them the same way.
pub fn handle_from_parts(
    cmd_tx: Sender<ProviderCommand>,
    stop: Arc<AtomicBool>,
    threads: Vec<thread::JoinHandle<()>>,
) -> FeedHandle {
    FeedHandle {
        cmd_tx: Some(cmd_tx),
        stop,
        threads,
    }
}

fn run_poller(
    api: ApiClient,
    poll_interval: Duration,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
    stop: Arc<AtomicBool>,
) {
    if !refresh_matches(&api, &tx) || !refresh_leagues(&api, &tx) {
        return;
    }
    let mut last_refresh = Instant::now();

    while !stop.load(Ordering::Relaxed) {
        thread::sleep(TICK);

        if last_refresh.elapsed() >= poll_interval {
            if !refresh_matches(&api, &tx) {
                return;
            }
            last_refresh = Instant::now();
        }

        loop {
            let cmd = match cmd_rx.try_recv() {
                Ok(cmd) => cmd,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("command channel closed, poller exiting");
                    return;
                }
            };
            if stop.load(Ordering::Relaxed) {
                return;
            }
            let keep_going = match cmd {
                ProviderCommand::Refresh => {
                    let ok = refresh_matches(&api, &tx);
                    last_refresh = Instant::now();
                    ok
                }
                ProviderCommand::RefreshLeagues => refresh_leagues(&api, &tx),
                ProviderCommand::FetchMatchDetail { match_id } => {
                    fetch_detail(&api, match_id, &tx)
                }
                ProviderCommand::FetchTeamH2h { team1, team2 } => {
                    let key = PairKey::new(team1, team2);
                    tx.send(Delta::TeamH2h {
                        key,
                        result: api.fetch_team_h2h(team1, team2),
                    })
                    .is_ok()
                }
                ProviderCommand::FetchPlayerH2h { player1, player2 } => {
                    let key = PairKey::new(player1, player2);
                    tx.send(Delta::PlayerH2h {
                        key,
                        result: api.fetch_player_h2h(player1, player2),
                    })
                    .is_ok()
                }
                ProviderCommand::FetchTeamCompare { team1, team2 } => {
                    let key = PairKey::new(team1, team2);
                    tx.send(Delta::TeamCompare {
                        key,
                        result: api.fetch_team_compare(team1, team2),
                    })
                    .is_ok()
                }
                ProviderCommand::FetchStandings { league_id } => tx
                    .send(Delta::Standings {
                        league_id,
                        result: api.fetch_standings(league_id),
                    })
                    .is_ok(),
            };
            if !keep_going {
                return;
            }
        }
    }
}

/// Returns false once the consumer is gone.
fn refresh_matches(api: &ApiClient, tx: &Sender<Delta>) -> bool {
    let delta = match api.fetch_matches() {
        Ok(matches) => {
            debug!(count = matches.len(), "snapshot fetched");
            Delta::Snapshot(matches)
        }
        Err(error) => Delta::FetchFailed {
            source: FeedSource::Matches,
            error,
        },
    };
    tx.send(delta).is_ok()
}

fn refresh_leagues(api: &ApiClient, tx: &Sender<Delta>) -> bool {
    let delta = match api.fetch_leagues() {
        Ok(leagues) => Delta::Leagues(leagues),
        Err(error) => Delta::FetchFailed {
            source: FeedSource::Leagues,
            error,
        },
    };
    tx.send(delta).is_ok()
}

/// Events and statistics are fetched independently; a missing half does not
/// discard the other.
fn fetch_detail(api: &ApiClient, match_id: u32, tx: &Sender<Delta>) -> bool {
    let timeline = api.fetch_match_events(match_id);
    let statistics = api.fetch_match_statistics(match_id);
    debug!(
        match_id,
        events = timeline.is_ok(),
        statistics = statistics.is_ok(),
        "detail fetched"
    );
    tx.send(Delta::MatchDetail {
        id: match_id,
        timeline,
        statistics,
    })
    .is_ok()
}
