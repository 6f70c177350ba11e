use std::io::Cursor;

mod support;

use tokio::io::{duplex, AsyncWriteExt, DuplexStream};

use nfs_pathserve::protocol::rpc::{self, SocketMessageHandler};
use nfs_pathserve::xdr::{self, deserialize, mount, nfs3, Serialize};

use support::{accept_body, call, call_message, context, MemFs, Void};

async fn write_record(socket: &mut DuplexStream, fragments: &[&[u8]]) {
    for (i, fragment) in fragments.iter().enumerate() {
        let mut header = fragment.len() as u32;
        if i + 1 == fragments.len() {
            header |= 1 << 31;
        }
        socket.write_all(&header.to_be_bytes()).await.expect("write fragment header");
        socket.write_all(fragment).await.expect("write fragment body");
    }
}

async fn read_reply(socket: &mut DuplexStream) -> Cursor<Vec<u8>> {
    let record = rpc::read_record(socket).await.expect("read reply").expect("reply record");
    Cursor::new(record)
}

fn null_call(xid: u32) -> Vec<u8> {
    call_message(xid, nfs3::PROGRAM, nfs3::VERSION, 0, xdr::rpc::opaque_auth::default(), &Void)
}

#[tokio::test]
async fn serves_calls_until_peer_closes() {
    let (mut client, server) = duplex(64 * 1024);
    let task = tokio::spawn(SocketMessageHandler::new(server, context(MemFs::new())).run());

    for xid in [1, 2] {
        write_record(&mut client, &[&null_call(xid)]).await;
        let mut reply = read_reply(&mut client).await;
        let msg = deserialize::<xdr::rpc::rpc_msg>(&mut reply).expect("deserialize reply");
        assert_eq!(msg.xid, xid);
        assert!(matches!(accept_body(&msg), xdr::rpc::accept_body::SUCCESS));
        assert_eq!(reply.position() as usize, reply.get_ref().len());
    }

    drop(client);
    task.await.expect("join").expect("clean shutdown");
}

#[tokio::test]
async fn reassembles_multi_fragment_records() {
    let (mut client, server) = duplex(64 * 1024);
    let mut handler = SocketMessageHandler::new(server, context(MemFs::new()));

    let msg = null_call(5);
    let (head, tail) = msg.split_at(10);
    write_record(&mut client, &[head, tail]).await;

    assert!(handler.handle_next().await.expect("handle call"));
    let mut reply = read_reply(&mut client).await;
    let msg = deserialize::<xdr::rpc::rpc_msg>(&mut reply).expect("deserialize reply");
    assert_eq!(msg.xid, 5);
}

#[tokio::test]
async fn rejects_oversized_rpc_fragment() {
    let (mut client, server) = duplex(1024);
    let mut handler = SocketMessageHandler::new(server, context(MemFs::new()));

    let oversized = rpc::MAX_RPC_RECORD_LENGTH + 1;
    let fragment_header = (1_u32 << 31) | (oversized as u32);
    client.write_all(&fragment_header.to_be_bytes()).await.expect("write fragment header");

    let err = handler.handle_next().await.expect_err("expected oversize error");
    assert!(err.to_string().contains("exceeds max"), "unexpected error: {err:?}");
}

#[tokio::test]
async fn closed_stream_ends_the_connection() {
    let (client, server) = duplex(1024);
    let mut handler = SocketMessageHandler::new(server, context(MemFs::new()));
    drop(client);
    assert!(!handler.handle_next().await.expect("clean end of stream"));
}

#[tokio::test]
async fn write_fragment_frames_empty_and_full_records() {
    let (mut client, mut server) = duplex(1024);
    rpc::write_fragment(&mut server, b"").await.expect("write empty");
    rpc::write_fragment(&mut server, b"abcd").await.expect("write record");
    drop(server);

    assert_eq!(rpc::read_record(&mut client).await.unwrap(), Some(Vec::new()));
    assert_eq!(rpc::read_record(&mut client).await.unwrap(), Some(b"abcd".to_vec()));
    assert_eq!(rpc::read_record(&mut client).await.unwrap(), None);
}

#[tokio::test]
async fn returns_rpc_mismatch_for_wrong_rpc_version() {
    let call = xdr::rpc::call_body {
        rpcvers: 3,
        prog: nfs3::PROGRAM,
        vers: nfs3::VERSION,
        proc: 0,
        cred: xdr::rpc::opaque_auth::default(),
        verf: xdr::rpc::opaque_auth::default(),
    };
    let mut msg = Vec::new();
    xdr::rpc::rpc_msg { xid: 11, body: xdr::rpc::rpc_body::CALL(call) }
        .serialize(&mut msg)
        .unwrap();

    let mut output = Vec::new();
    let mut context = context(MemFs::new());
    rpc::handle_rpc(&mut Cursor::new(msg), &mut output, &mut context).await.unwrap();

    let reply = deserialize::<xdr::rpc::rpc_msg>(&mut Cursor::new(output)).unwrap();
    assert_eq!(reply.xid, 11);
    match reply.body {
        xdr::rpc::rpc_body::REPLY(xdr::rpc::reply_body::MSG_DENIED(
            xdr::rpc::rejected_reply::RPC_MISMATCH(info),
        )) => {
            assert_eq!((info.low, info.high), (2, 2));
        }
        other => panic!("expected RPC_MISMATCH, got {:?}", other),
    }
}

#[tokio::test]
async fn returns_prog_unavail_for_unknown_program() {
    let mut context = context(MemFs::new());
    let (reply, _) = call(&mut context, 100021, 4, 0, &Void).await;
    assert!(matches!(accept_body(&reply), xdr::rpc::accept_body::PROG_UNAVAIL));
}

#[tokio::test]
async fn returns_prog_mismatch_for_unsupported_versions() {
    let mut context = context(MemFs::new());
    for (program, version, served) in
        [(nfs3::PROGRAM, 4, nfs3::VERSION), (mount::PROGRAM, 1, mount::VERSION)]
    {
        let (reply, _) = call(&mut context, program, version, 0, &Void).await;
        match accept_body(&reply) {
            xdr::rpc::accept_body::PROG_MISMATCH(info) => {
                assert_eq!(info.low, served);
                assert_eq!(info.high, served);
            }
            other => panic!("expected PROG_MISMATCH, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn returns_proc_unavail_for_unserved_procedures() {
    let mut context = context(MemFs::new());
    let write = nfs3::NFSProgram::NFSPROC3_WRITE as u32;
    let (reply, _) = call(&mut context, nfs3::PROGRAM, nfs3::VERSION, write, &Void).await;
    assert!(matches!(accept_body(&reply), xdr::rpc::accept_body::PROC_UNAVAIL));

    let dump = mount::MountProgram::MOUNTPROC3_DUMP as u32;
    let (reply, _) = call(&mut context, mount::PROGRAM, mount::VERSION, dump, &Void).await;
    assert!(matches!(accept_body(&reply), xdr::rpc::accept_body::PROC_UNAVAIL));
}

#[tokio::test]
async fn decodes_auth_unix_credentials() {
    let credentials = xdr::rpc::auth_unix {
        stamp: 1,
        machinename: b"client".to_vec(),
        uid: 1000,
        gid: 100,
        gids: vec![100, 27],
    };
    let mut body = Vec::new();
    credentials.serialize(&mut body).unwrap();
    let cred = xdr::rpc::opaque_auth { flavor: xdr::rpc::auth_flavor::AUTH_UNIX, body };
    let msg = call_message(3, nfs3::PROGRAM, nfs3::VERSION, 0, cred, &Void);

    let mut output = Vec::new();
    let mut context = context(MemFs::new());
    rpc::handle_rpc(&mut Cursor::new(msg), &mut output, &mut context).await.unwrap();
    assert_eq!(context.auth.uid, 1000);
    assert_eq!(context.auth.gids, vec![100, 27]);
}

#[tokio::test]
async fn garbage_credentials_get_garbage_args() {
    let cred =
        xdr::rpc::opaque_auth { flavor: xdr::rpc::auth_flavor::AUTH_UNIX, body: vec![0, 0] };
    let msg = call_message(4, nfs3::PROGRAM, nfs3::VERSION, 0, cred, &Void);

    let mut output = Vec::new();
    let mut context = context(MemFs::new());
    rpc::handle_rpc(&mut Cursor::new(msg), &mut output, &mut context).await.unwrap();
    let reply = deserialize::<xdr::rpc::rpc_msg>(&mut Cursor::new(output)).unwrap();
    assert!(matches!(accept_body(&reply), xdr::rpc::accept_body::GARBAGE_ARGS));
}

#[tokio::test]
async fn undecodable_arguments_are_invalid() {
    let mut context = context(MemFs::new());
    let getattr = nfs3::NFSProgram::NFSPROC3_GETATTR as u32;
    let (reply, mut results) =
        call(&mut context, nfs3::PROGRAM, nfs3::VERSION, getattr, &Void).await;
    assert!(matches!(accept_body(&reply), xdr::rpc::accept_body::SUCCESS));
    let status = deserialize::<nfs3::nfsstat3>(&mut results).unwrap();
    assert_eq!(status, nfs3::nfsstat3::NFS3ERR_INVAL);
    assert_eq!(results.position() as usize, results.get_ref().len());
}

#[tokio::test]
async fn replies_are_not_calls() {
    let mut msg = Vec::new();
    xdr::rpc::make_success_reply(8).serialize(&mut msg).unwrap();
    let mut output = Vec::new();
    let mut context = context(MemFs::new());
    assert!(rpc::handle_rpc(&mut Cursor::new(msg), &mut output, &mut context).await.is_err());
    assert!(output.is_empty());
}
