use std::time::{Duration, Instant};

use tabletop_client::connection::{join_url, NetEvent, ServerConnection};
use tabletop_client::events::{EventBus, SessionEvent};
use tabletop_client::participant::LocalParticipant;
use tabletop_client::preferences::JsonFilePreferences;
use tabletop_client::viewpoint::LoggingViewpoint;
use tabletop_shared::color::Color;
use tabletop_shared::seat::SeatRequest;
use tracing_subscriber::EnvFilter;

const SEAT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// `any`, `spectator`, `physical:N` or `logical:N`
fn parse_seat(arg: &str) -> Option<SeatRequest> {
    match arg {
        "any" => return Some(SeatRequest::Any),
        "spectator" => return Some(SeatRequest::Spectator),
        _ => {}
    }
    let (kind, index) = arg.split_once(':')?;
    let index = index.parse().ok()?;
    match kind {
        "physical" => Some(SeatRequest::Physical { index }),
        "logical" => Some(SeatRequest::Logical { index }),
        _ => None,
    }
}

fn describe(event: &SessionEvent) -> String {
    match event {
        SessionEvent::SeatOccupancyChanged {
            slot,
            occupied,
            participant,
        } => format!("seat {} occupied={} by {:?}", slot, occupied, participant),
        SessionEvent::PlayerColorChanged { participant, color } => match color {
            Some(c) => format!("participant {} is {}", participant, c),
            None => format!("participant {} has no color", participant),
        },
        SessionEvent::PlayerSeatChanged {
            participant,
            old,
            new,
        } => format!("participant {} moved {:?} -> {:?}", participant, old, new),
        SessionEvent::ActivePlayerChanged { index } => format!("active player {:?}", index),
        SessionEvent::ColorPaletteChanged => "palette changed".to_string(),
        SessionEvent::LayoutChanged { count } => format!("layout now {} seats", count),
        SessionEvent::ColorConflictResolved {
            participant,
            requested,
            assigned,
        } => format!(
            "participant {} asked for {} and got {}",
            participant, requested, assigned
        ),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut url = "ws://127.0.0.1:9002/ws".to_string();
    let mut name = String::new();
    let mut prefs_path = "tabletop-prefs.json".to_string();
    let mut seat: Option<SeatRequest> = None;
    let mut color: Option<Color> = None;
    let mut duration_secs: u64 = 30;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            "--name" => {
                i += 1;
                name = args.get(i).cloned().unwrap_or_default();
            }
            "--prefs" => {
                i += 1;
                prefs_path = args.get(i).cloned().unwrap_or(prefs_path);
            }
            "--seat" => {
                i += 1;
                seat = args.get(i).and_then(|s| parse_seat(s));
                if seat.is_none() {
                    eprintln!("--seat expects any, spectator, physical:N or logical:N");
                    std::process::exit(2);
                }
            }
            "--color" => {
                i += 1;
                color = args.get(i).and_then(|s| s.parse().ok());
                if color.is_none() {
                    eprintln!("--color expects #RRGGBB");
                    std::process::exit(2);
                }
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(2);
            }
        }
        i += 1;
    }

    let join = match join_url(&url, &name) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("Invalid --url {}: {}", url, e);
            std::process::exit(2);
        }
    };

    let prefs = match JsonFilePreferences::open(&prefs_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Cannot read preferences {}: {}", prefs_path, e);
            std::process::exit(1);
        }
    };

    let bus = EventBus::new();
    let _printer = bus.subscribe(|e| println!("{}", describe(e)));
    let mut participant = LocalParticipant::new(LoggingViewpoint::default(), prefs, bus);

    tracing::info!("Connecting to {}", join);
    let conn = ServerConnection::new(join);

    let deadline = Instant::now() + Duration::from_secs(duration_secs);
    let mut requested_at: Option<Instant> = None;

    while Instant::now() < deadline {
        if let Some(since) = requested_at {
            if participant.requester().is_pending() && since.elapsed() > SEAT_REQUEST_TIMEOUT {
                participant.seat_request_timed_out();
                participant.acknowledge_seat_request();
                requested_at = None;
            } else if !participant.requester().is_pending() {
                participant.acknowledge_seat_request();
                requested_at = None;
            }
        }

        let Some(event) = conn.wait_event(Duration::from_millis(100)) else {
            continue;
        };
        match event {
            NetEvent::Connected => tracing::info!("Connected"),
            NetEvent::Disconnected => {
                tracing::info!("Disconnected");
                participant.disconnected();
            }
            NetEvent::ProtocolMismatch { server, client } => {
                eprintln!("Protocol mismatch: host {} vs client {}", server, client);
                std::process::exit(1);
            }
            NetEvent::Message(msg) => {
                let welcomed = matches!(msg, tabletop_shared::protocol::ServerMsg::Welcome(_));
                match participant.handle_server_msg(msg) {
                    Ok(out) => {
                        for m in out {
                            conn.send(m);
                        }
                    }
                    Err(e) => tracing::warn!("Ignoring host message: {}", e),
                }
                if !welcomed {
                    continue;
                }
                if let Some(c) = color {
                    conn.send(participant.register_color(c));
                }
                if let Some(request) = seat {
                    match participant.request_seat(request) {
                        Ok(Some(m)) => {
                            conn.send(m);
                            requested_at = Some(Instant::now());
                        }
                        Ok(None) => participant.acknowledge_seat_request(),
                        Err(e) => tracing::warn!("Cannot request {:?}: {}", request, e),
                    }
                }
            }
        }
    }
}
