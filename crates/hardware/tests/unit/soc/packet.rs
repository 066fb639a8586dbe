//! Packet Tests.
//!
//! Verifies request classification, block geometry, and the request to
//! response conversion.

use pretty_assertions::assert_eq;
use rstest::rstest;

use cachesim_core::common::ProtocolError;
use cachesim_core::soc::packet::{MemCmd, Request, RespCmd};

#[rstest]
#[case(Request::read(0, 4), true, false, true)]
#[case(Request::write(0, vec![1]), false, true, true)]
#[case(Request::writeback(0, vec![0; 64]), false, true, false)]
fn classification(
    #[case] req: Request,
    #[case] read: bool,
    #[case] write: bool,
    #[case] needs_response: bool,
) {
    assert_eq!(req.is_read(), read);
    assert_eq!(req.is_write(), write);
    assert_eq!(req.needs_response(), needs_response);
}

#[rstest]
#[case(0x40, 64, true, true)]
#[case(0x40, 32, false, true)]
#[case(0x44, 60, false, true)]
#[case(0x44, 61, false, false)]
#[case(0x7f, 1, false, true)]
fn block_geometry(
    #[case] addr: u64,
    #[case] size: usize,
    #[case] whole: bool,
    #[case] fits: bool,
) {
    let req = Request::read(addr, size);
    assert_eq!(req.block_addr(64), 0x40);
    assert_eq!(req.block_offset(64), (addr - 0x40) as usize);
    assert_eq!(req.is_block_access(64), whole);
    assert_eq!(req.fits_in_block(64), fits);
}

#[test]
fn read_response_carries_filled_buffer() {
    let mut req = Request::read(0x108, 4);
    let line: Vec<u8> = (0..64).collect();
    req.set_data_from_block(&line).unwrap();
    let resp = req.complete().unwrap();
    assert_eq!(resp.cmd(), RespCmd::ReadResp);
    assert_eq!(resp.addr(), 0x108);
    assert_eq!(resp.data(), &[8, 9, 10, 11]);
}

#[test]
fn write_into_short_line_spans() {
    let req = Request::write(0x6, vec![1, 2, 3]);
    let mut line = vec![0u8; 8];
    assert_eq!(
        req.write_data_to_block(&mut line),
        Err(ProtocolError::SpansBlocks {
            addr: 0x6,
            size: 3,
            block_size: 8
        })
    );
}

#[test]
fn display_shows_command_and_span() {
    assert_eq!(Request::read(0x40, 64).to_string(), "ReadReq [0x40:0x80]");
    assert_eq!(MemCmd::WritebackDirty.to_string(), "WritebackDirty");
}
