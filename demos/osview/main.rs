use std::path::PathBuf;
use std::sync::Arc;

use nfs_pathserve::handle::PathHandles;
use nfs_pathserve::local_fs::LocalFs;
use nfs_pathserve::tcp::{NFSTcp, NFSTcpListener};
use nfs_pathserve::vfs::{FileSystem, NullAuthHandler};

const HOSTPORT: u32 = 11111;

/// Serves a local directory read only on port 11111.
///
/// Mount it with
/// `mount -t nfs -o nolocks,vers=3,tcp,port=11111,mountport=11111 127.0.0.1:/ /mnt`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(std::io::stderr)
        .init();

    let mut export_name = String::from("/");
    let mut path: Option<PathBuf> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--export" => {
                export_name = args.next().ok_or_else(|| anyhow::anyhow!("--export needs a name"))?;
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: osview [--export NAME] <DIRECTORY>\n\
                     \n\
                     Options:\n\
                       --export NAME   Name clients mount (default: /)\n\
                       -h, --help      Show this help and exit"
                );
                return Ok(());
            }
            _ if arg.starts_with('-') => {
                eprintln!("Unknown flag: {arg}");
                eprintln!("Run with --help for usage.");
                std::process::exit(2);
            }
            _ => {
                if path.is_some() {
                    eprintln!("Unexpected extra argument: {arg}");
                    std::process::exit(2);
                }
                path = Some(PathBuf::from(arg));
            }
        }
    }
    let path = path.ok_or_else(|| anyhow::anyhow!("must supply directory to serve"))?;

    let fs: Arc<dyn FileSystem> = Arc::new(LocalFs::new(path));
    let handler = PathHandles::new(NullAuthHandler::new(fs.clone()).with_export_name(export_name), fs);
    let listener = NFSTcpListener::bind(&format!("127.0.0.1:{HOSTPORT}"), handler).await?;
    listener.handle_forever().await?;
    Ok(())
}
