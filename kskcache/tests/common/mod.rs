//! Serveur HTTP minimal sur boucle locale pour les tests de téléchargement.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub struct TestServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl TestServer {
    /// Nombre de requêtes reçues
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Démarre un serveur qui répond `status` avec `body`, après `delay`.
///
/// Chaque réponse ferme la connexion, donc une requête = une connexion.
pub async fn serve_bytes(body: Vec<u8>, status: u16, delay: Duration) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_counter = hits.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            hits_counter.fetch_add(1, Ordering::SeqCst);
            let body = body.clone();
            tokio::spawn(async move {
                if read_request(&mut socket).await.is_err() {
                    return;
                }
                tokio::time::sleep(delay).await;
                let reason = if status == 200 { "OK" } else { "Error" };
                let header = format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    reason,
                    body.len()
                );
                let _ = socket.write_all(header.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    TestServer {
        url: format!("http://{}", addr),
        hits,
    }
}

/// Démarre un serveur qui redirige indéfiniment vers lui-même.
pub async fn serve_redirect_loop() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_counter = hits.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            hits_counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                if read_request(&mut socket).await.is_err() {
                    return;
                }
                let header = format!(
                    "HTTP/1.1 302 Found\r\nLocation: http://{}/loop\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    addr
                );
                let _ = socket.write_all(header.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    TestServer {
        url: format!("http://{}", addr),
        hits,
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> std::io::Result<()> {
    let mut buf = [0u8; 1024];
    let mut seen: Vec<u8> = Vec::new();
    loop {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Err(std::io::Error::other("connection closed before headers"));
        }
        seen.extend_from_slice(&buf[..n]);
        if seen.windows(4).any(|w| w == b"\r\n\r\n") {
            return Ok(());
        }
    }
}
