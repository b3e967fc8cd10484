// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The concrete scenarios and quantified properties from spec.md §8,
//! driven against a scripted in-memory channel.

use c1218_toolkit::credentials::Credentials;
use c1218_toolkit::error::{Error, ProcedureError, ProcedureResult};
use c1218_toolkit::framer::Framer;
use c1218_toolkit::session::link::LinkSession;
use c1218_toolkit::table::cache::TableCache;
use c1218_toolkit::table::io::TableIo;
use c1218_toolkit::testing::ScriptedChannel;

fn frame(payload: &[u8], toggle: bool) -> Vec<u8> {
    Framer::new().encode(payload, toggle, 0)
}

fn ok_status() -> Vec<u8> {
    vec![0x00]
}

fn read_response(data: &[u8]) -> Vec<u8> {
    let mut body = vec![0x00];
    body.extend_from_slice(&(data.len() as u16).to_be_bytes());
    body.extend_from_slice(data);
    body.push(Framer::new().data_checksum(data));
    body
}

// S1: Identify.
#[test]
fn s1_identify_reports_version_revision_and_feature_count() {
    let mut chan = ScriptedChannel::new();
    // status=OK, std_version=0, std_revision=0, feature_count=1, feature[0]=0
    chan.push_input(&frame(&[0x00, 0x00, 0x00, 0x01, 0x00], true));
    let mut link = LinkSession::new(chan);

    let ident = link.open().expect("identify");
    assert_eq!(ident.std_version, 0);
    assert_eq!(ident.std_revision, 0);
    assert_eq!(ident.feature_count, 1);
    assert_eq!(link.state(), c1218_toolkit::session::SessionState::Identified);
}

// S2: Logon success.
#[test]
fn s2_logon_success_reaches_authenticated() {
    let mut chan = ScriptedChannel::new();
    chan.push_input(&frame(&ok_status(), true));
    let mut link = LinkSession::new(chan);

    let mut username = [0u8; 10];
    username[..4].copy_from_slice(b"0000");
    link.logon(&username, 0x0000).expect("logon");
    assert_eq!(link.state(), c1218_toolkit::session::SessionState::Authenticated);
}

// S3 / S4: endian latch from table 0, byte 0 bit 0.
#[test]
fn s3_little_endian_table0() {
    let mut chan = ScriptedChannel::new();
    chan.push_input(&frame(&read_response(&[0x00]), true));
    let mut link = LinkSession::new(chan);
    let mut cache = TableCache::new();

    let body = TableIo::read_table(&mut link, &mut cache, true, 0).expect("read table 0");
    assert_eq!(body[0] & 0x01, 0);
}

#[test]
fn s4_big_endian_table0() {
    let mut chan = ScriptedChannel::new();
    chan.push_input(&frame(&read_response(&[0x01]), true));
    let mut link = LinkSession::new(chan);
    let mut cache = TableCache::new();

    let body = TableIo::read_table(&mut link, &mut cache, true, 0).expect("read table 0");
    assert_eq!(body[0] & 0x01, 1);
}

// S5: partial write at an offset, then offset-read returns exactly what was written.
#[test]
fn s5_offset_write_then_offset_read_round_trips() {
    let mut chan = ScriptedChannel::new();
    chan.push_input(&frame(&ok_status(), true)); // write ack
    chan.push_input(&frame(&read_response(&[0xAA, 0xBB, 0xCC, 0xDD]), true)); // read back
    let mut link = LinkSession::new(chan);
    let mut cache = TableCache::new();

    TableIo::write_table_offset(&mut link, &mut cache, 21, 16, &[0xAA, 0xBB, 0xCC, 0xDD])
        .expect("offset write");
    let data = TableIo::read_table_offset(&mut link, 21, 16, 4).expect("offset read");
    assert_eq!(data, vec![0xAA, 0xBB, 0xCC, 0xDD]);
}

// S6: procedure 9 returns a security-error result code (7) via table 8.
#[test]
fn s6_procedure_nine_security_error() {
    let mut chan = ScriptedChannel::new();
    chan.push_input(&frame(&ok_status(), true)); // table 7 write ack
    let table8_payload = {
        let mut p = vec![5u8, 7u8];
        p.extend_from_slice(&[0xFF, 0xEE]);
        p
    };
    chan.push_input(&frame(&read_response(&table8_payload), true));
    let mut link = LinkSession::new(chan);
    let mut cache = TableCache::new();
    let mut seq = 5u8;

    let (result, data) = c1218_toolkit::procedure::ProcedureRunner::run_procedure(
        &mut link, &mut cache, &mut seq, 9, false, &[], true,
    )
    .expect("procedure 9");
    assert_eq!(result, ProcedureResult::NoAuthorization);
    assert_eq!(data, vec![0xFF, 0xEE]);
}

// Property 3: the toggle bit alternates across consecutive requests on the
// same session, flipping only after a successful reply to the previous one.
#[test]
fn toggle_alternates_across_consecutive_requests() {
    let mut chan = ScriptedChannel::new();
    chan.push_input(&frame(&[0x00, 0x00, 0x00, 0x01, 0x00], true)); // open
    for _ in 0..4 {
        chan.push_input(&frame(&ok_status(), true)); // wait() replies
    }
    let mut link = LinkSession::new(chan);
    link.open().expect("open");

    // toggle starts false and flips on every successful exchange; open()
    // consumes one flip, so the four wait() requests below see it
    // true, false, true, false in turn.
    let mut toggles = Vec::new();
    for _ in 0..4 {
        let before = link.channel_mut().written().len();
        link.wait(1).expect("wait");
        let written = link.channel_mut().written();
        // request frame layout: STP, IDENTITY, CTRL, SEQ, LEN_HI, LEN_LO, ...
        toggles.push(written[before + 2] & 0x20 != 0);
    }
    assert_eq!(toggles, vec![true, false, true, false]);
}

// Property 4: reassembly concatenates multi-packet responses in receipt order.
#[test]
fn reassembly_concatenates_in_receipt_order() {
    let mut chan = ScriptedChannel::new();
    chan.push_input(&Framer::new().encode(&[1, 2, 3], false, 2));
    chan.push_input(&Framer::new().encode(&[4, 5, 6], false, 1));
    chan.push_input(&Framer::new().encode(&[7, 8, 9], false, 0));
    let mut link = LinkSession::new(chan);

    let response = link.send_service(&[0x20]).expect("multi-packet response");
    assert_eq!(response, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
}

// Property 5: cache coherence — a write bypasses and invalidates, the next
// read re-issues on the wire; writing table 7 also invalidates table 8.
#[test]
fn cache_coherence_after_write() {
    let mut chan = ScriptedChannel::new();
    chan.push_input(&frame(&read_response(&[1, 2, 3]), true)); // first read table 5
    chan.push_input(&frame(&ok_status(), true)); // write table 5
    chan.push_input(&frame(&read_response(&[9, 9, 9]), true)); // fresh read after write
    let mut link = LinkSession::new(chan);
    let mut cache = TableCache::new();

    let first = TableIo::read_table(&mut link, &mut cache, true, 5).expect("first read");
    assert_eq!(first, vec![1, 2, 3]);

    // Cached: a second read with no more scripted input would fail if it
    // hit the wire, so this only passes if the cache served it.
    let cached = TableIo::read_table(&mut link, &mut cache, true, 5).expect("cached read");
    assert_eq!(cached, vec![1, 2, 3]);

    TableIo::write_table(&mut link, &mut cache, 5, &[0xAB]).expect("write");
    let fresh = TableIo::read_table(&mut link, &mut cache, true, 5).expect("fresh read");
    assert_eq!(fresh, vec![9, 9, 9]);
}

#[test]
fn writing_table_seven_invalidates_table_eight() {
    let mut chan = ScriptedChannel::new();
    chan.push_input(&frame(&read_response(&[1]), true)); // read table 8 (populate cache)
    chan.push_input(&frame(&ok_status(), true)); // write table 7
    chan.push_input(&frame(&read_response(&[2]), true)); // fresh read table 8
    let mut link = LinkSession::new(chan);
    let mut cache = TableCache::new();

    let first = TableIo::read_table(&mut link, &mut cache, true, 8).expect("seed cache");
    assert_eq!(first, vec![1]);

    TableIo::write_table(&mut link, &mut cache, 7, &[0x00]).expect("write table 7");

    let after = TableIo::read_table(&mut link, &mut cache, true, 8).expect("bypassed cache");
    assert_eq!(after, vec![2]);
}

// Property 6: after the third sequence mismatch on table 8, a procedure
// call raises SequenceMismatch rather than retrying forever.
#[test]
fn procedure_sequence_mismatch_raises_after_three_retries() {
    let mut chan = ScriptedChannel::new();
    chan.push_input(&frame(&ok_status(), true)); // table 7 write ack
    for _ in 0..3 {
        chan.push_input(&frame(&read_response(&[0xFF, 0x00]), true)); // wrong seq each time
    }
    let mut link = LinkSession::new(chan);
    let mut cache = TableCache::new();
    let mut seq = 1u8;

    let err = c1218_toolkit::procedure::ProcedureRunner::run_procedure(
        &mut link, &mut cache, &mut seq, 1, false, &[], true,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Procedure(ProcedureError::SequenceMismatch)
    ));
}

// Credentials are never logged: Debug must redact the password even when
// constructed from config-shaped hex input.
#[test]
fn credentials_stay_redacted_in_debug_output() {
    let creds = Credentials::from_hex_password("0000", 0, "cafebabe").expect("valid");
    assert!(!format!("{creds:?}").contains("cafe"));
}
