use std::io::{Cursor, ErrorKind};

use nfs_pathserve::xdr::{self, deserialize, mount, nfs3, Serialize};

fn encode(value: &impl Serialize) -> Vec<u8> {
    let mut buf = Vec::new();
    value.serialize(&mut buf).expect("cannot serialize");
    buf
}

#[test]
fn scalars_are_big_endian_words() {
    assert_eq!(encode(&true), [0, 0, 0, 1]);
    assert_eq!(encode(&false), [0, 0, 0, 0]);
    assert_eq!(encode(&0x0102_0304_u32), [1, 2, 3, 4]);
    assert_eq!(encode(&-2_i32), [0xff, 0xff, 0xff, 0xfe]);
    assert_eq!(encode(&1_u64), [0, 0, 0, 0, 0, 0, 0, 1]);
}

#[test]
fn opaque_data_is_padded_to_words() {
    assert_eq!(encode(&b"abc".to_vec()), [0, 0, 0, 3, b'a', b'b', b'c', 0]);
    assert_eq!(encode(&b"abcd".to_vec()), [0, 0, 0, 4, b'a', b'b', b'c', b'd']);
    assert_eq!(encode(&Vec::<u8>::new()), [0, 0, 0, 0]);
    assert_eq!(encode(&[7_u8; 2]), [7, 7, 0, 0]);

    let name: nfs3::filename3 = "a.txt".into();
    assert_eq!(encode(&name), [0, 0, 0, 5, b'a', b'.', b't', b'x', b't', 0, 0, 0]);
}

#[test]
fn optionals_carry_a_discriminant() {
    assert_eq!(encode(&None::<u32>), [0, 0, 0, 0]);
    assert_eq!(encode(&Some(9_u32)), [0, 0, 0, 1, 0, 0, 0, 9]);
    assert_eq!(encode(&nfs3::post_op_attr::None).len(), 4);
    assert_eq!(encode(&Some(nfs3::fattr3::default())).len(), 4 + 84);
}

#[test]
fn truncated_input_fails() {
    let err = deserialize::<u32>(&mut Cursor::new(vec![0, 0])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEof);

    let err = deserialize::<Vec<u8>>(&mut Cursor::new(vec![0, 0, 0, 8, 1, 2])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
}

#[test]
fn invalid_discriminants_fail() {
    let err = deserialize::<bool>(&mut Cursor::new(vec![0, 0, 0, 2])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);

    let err = deserialize::<nfs3::ftype3>(&mut Cursor::new(vec![0, 0, 0, 99])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}

#[test]
fn entryplus3_layout() {
    let entry = nfs3::dir::entryplus3 {
        fileid: 7,
        name: "ab".into(),
        cookie: 3,
        name_attributes: None,
        name_handle: Some(nfs3::nfs_fh3 { data: vec![1, 2, 3, 4, 5] }),
    };
    let expected: Vec<u8> = [
        &[0, 0, 0, 0, 0, 0, 0, 7][..],
        &[0, 0, 0, 2, b'a', b'b', 0, 0],
        &[0, 0, 0, 0, 0, 0, 0, 3],
        &[0, 0, 0, 0],
        &[0, 0, 0, 1, 0, 0, 0, 5, 1, 2, 3, 4, 5, 0, 0, 0],
    ]
    .concat();
    assert_eq!(encode(&entry), expected);
}

#[test]
fn readdirplus_arguments_decode() {
    let args = nfs3::dir::READDIRPLUS3args {
        dir: nfs3::nfs_fh3 { data: b"handle".to_vec() },
        cookie: 4,
        cookieverf: [0; 8],
        dircount: 1024,
        maxcount: 4096,
    };
    let decoded =
        deserialize::<nfs3::dir::READDIRPLUS3args>(&mut Cursor::new(encode(&args))).unwrap();
    assert_eq!(decoded.dir, args.dir);
    assert_eq!(decoded.cookie, 4);
    assert_eq!((decoded.dircount, decoded.maxcount), (1024, 4096));
}

#[test]
fn exports_list_has_one_node() {
    let node = mount::exportnode { ex_dir: b"/".to_vec(), ex_groups: vec![] };
    assert_eq!(encode(&node), [0, 0, 0, 1, b'/', 0, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn nfstime_from_file_time() {
    let time: nfs3::nfstime3 = filetime::FileTime::from_unix_time(1_700_000_000, 25).into();
    assert_eq!(time, nfs3::nfstime3 { seconds: 1_700_000_000, nseconds: 25 });
    let back: filetime::FileTime = time.into();
    assert_eq!(back.unix_seconds(), 1_700_000_000);
    assert_eq!(back.nanoseconds(), 25);
}

#[test]
fn success_reply_header() {
    let reply = encode(&xdr::rpc::make_success_reply(0x11));
    // xid, REPLY, MSG_ACCEPTED, AUTH_NULL verifier, SUCCESS
    let expected: Vec<u8> = [
        &[0, 0, 0, 0x11][..],
        &[0, 0, 0, 1],
        &[0, 0, 0, 0],
        &[0, 0, 0, 0, 0, 0, 0, 0],
        &[0, 0, 0, 0],
    ]
    .concat();
    assert_eq!(reply, expected);
}
