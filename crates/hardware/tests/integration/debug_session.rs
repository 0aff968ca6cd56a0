//! End-to-end debug sessions.

use pretty_assertions::assert_eq;
use rvex_sim::PlatformBuilder;

use crate::common::harness::{TestPlatform, test_config};

// ══════════════════════════════════════════════════════════
// 1. Memory access
// ══════════════════════════════════════════════════════════

#[test]
fn write_then_read_word() {
    let platform = TestPlatform::start(test_config());
    let mut client = platform.connect();

    assert_eq!(client.command("Write,00001000,4,DEADBEEF;"), "OK,Write,OK,00001000,4;");
    assert_eq!(client.command("Read,1000,4;"), "OK,Read,OK,00001000,4,DEADBEEF;");
}

#[test]
fn unaligned_write_keeps_neighbouring_bytes() {
    let platform = TestPlatform::start(test_config());
    let mut client = platform.connect();

    assert_eq!(client.command("Write,2000,8,0011223344556677;"), "OK,Write,OK,00002000,8;");
    assert_eq!(client.command("Write,2003,3,AABBCC;"), "OK,Write,OK,00002003,3;");
    assert_eq!(client.command("Read,2000,8;"), "OK,Read,OK,00002000,8,001122AABBCC6677;");
    assert_eq!(client.command("Read,2005,2;"), "OK,Read,OK,00002005,2,CC66;");
}

#[test]
fn large_access_round_trips() {
    let platform = TestPlatform::start(test_config());
    let mut client = platform.connect();

    let data: String = (0..4096).map(|i| format!("{:02X}", i % 251)).collect();
    assert_eq!(
        client.command(&format!("Write,10001,4096,{data};")),
        "OK,Write,OK,00010001,4096;"
    );
    assert_eq!(
        client.command("Read,10001,4096;"),
        format!("OK,Read,OK,00010001,4096,{data};")
    );
}

#[test]
fn preloaded_image_is_visible() {
    let builder = PlatformBuilder::new(test_config()).load_image(0x400, b"r-VEX".to_vec());
    let platform = TestPlatform::start_with(builder);
    let mut client = platform.connect();

    assert_eq!(client.command("Read,400,5;"), "OK,Read,OK,00000400,5,722D564558;");
}

#[test]
fn slow_memory_gives_the_same_answers() {
    let mut config = test_config();
    config.memory.read_latency = 7;
    config.memory.write_latency = 3;
    config.memory.read_period = 2;
    config.memory.write_period = 1;
    let platform = TestPlatform::start(config);
    let mut client = platform.connect();

    assert_eq!(client.command("Write,3FE,6,A1A2A3A4A5A6;"), "OK,Write,OK,000003FE,6;");
    assert_eq!(client.command("Read,3FC,12;"), "OK,Read,OK,000003FC,12,0000A1A2A3A4A5A600000000;");
}

#[test]
fn zero_byte_access_completes_immediately() {
    let platform = TestPlatform::start(test_config());
    let mut client = platform.connect();

    assert_eq!(client.command("Read,1234,0;"), "OK,Read,OK,00001234,0,;");
    assert_eq!(client.command("Write,1234,0;"), "OK,Write,OK,00001234,0;");
}

// ══════════════════════════════════════════════════════════
// 2. Faults and errors
// ══════════════════════════════════════════════════════════

#[test]
fn unmapped_read_faults() {
    let platform = TestPlatform::start(test_config());
    let mut client = platform.connect();

    assert_eq!(client.command("Read,FFFFFFF0,4;"), "OK,Read,Fault,FFFFFFF0,4,00000000;");
}

#[test]
fn fault_in_the_middle_of_an_access_and_recovery() {
    let platform = TestPlatform::start(test_config());
    let mut client = platform.connect();

    assert_eq!(client.command("Write,7FFFFFF8,4,01020304;"), "OK,Write,OK,7FFFFFF8,4;");
    assert_eq!(client.command("Read,7FFFFFF8,16;"), "OK,Read,Fault,7FFFFFF8,16,00000000;");
    assert_eq!(client.command("Read,7FFFFFF8,4;"), "OK,Read,OK,7FFFFFF8,4,01020304;");
}

#[test]
fn fault_with_slow_memory_drains_before_next_access() {
    let mut config = test_config();
    config.memory.read_latency = 20;
    let platform = TestPlatform::start(config);
    let mut client = platform.connect();

    assert_eq!(client.command("Read,FFFFFFF8,16;"), "OK,Read,Fault,FFFFFFF8,16,00000000;");
    assert_eq!(client.command("Write,0,4,CAFEF00D;"), "OK,Write,OK,00000000,4;");
    assert_eq!(client.command("Read,0,4;"), "OK,Read,OK,00000000,4,CAFEF00D;");
}

#[test]
fn rom_is_a_simulator_error() {
    let platform = TestPlatform::start(test_config());
    let mut client = platform.connect();

    assert_eq!(client.command("ROM,0,4;"), "Error,ROM,SimulatorError;");
}

#[test]
fn protocol_errors_are_reported() {
    let platform = TestPlatform::start(test_config());
    let mut client = platform.connect();

    assert_eq!(client.command("Read,xyz,4;"), "Error,Read,SyntaxError;");
    assert_eq!(client.command("Read,0,4097;"), "Error,Read,AccessTooLarge;");
    assert_eq!(client.command("Write,0,2,AA;"), "Error,Write,DataSizeIncorrect;");
    assert_eq!(client.command("Jump,0;"), "Error,Jump,UnknownCommand;");
}

#[test]
fn oversized_command_is_rejected_and_session_continues() {
    let platform = TestPlatform::start(test_config());
    let mut client = platform.connect();

    let huge = format!("Write,0,4096,{};", "A".repeat(9000));
    assert_eq!(client.command(&huge), "Error,Write,CmdBufferOverrun;");
    assert_eq!(client.command("Write,0,1,5A;"), "OK,Write,OK,00000000,1;");
    assert_eq!(client.command("Read,0,1;"), "OK,Read,OK,00000000,1,5A;");
}

// ══════════════════════════════════════════════════════════
// 3. Sessions
// ══════════════════════════════════════════════════════════

#[test]
fn pipelined_commands_are_answered_in_order() {
    let platform = TestPlatform::start(test_config());
    let mut client = platform.connect();

    client.send("Write,40,4,01020304;\nRead,40,2;\n Bogus;\nRead,42,2;\n");
    assert_eq!(client.reply(), "OK,Write,OK,00000040,4;");
    assert_eq!(client.reply(), "OK,Read,OK,00000040,2,0102;");
    assert_eq!(client.reply(), "Error,Bogus,UnknownCommand;");
    assert_eq!(client.reply(), "OK,Read,OK,00000042,2,0304;");
}

#[test]
fn two_clients_get_their_own_replies() {
    let platform = TestPlatform::start(test_config());
    let mut alice = platform.connect();
    let mut bob = platform.connect();

    alice.send("Write,100,4,AAAAAAAA;");
    bob.send("Write,200,4,BBBBBBBB;");
    assert_eq!(alice.reply(), "OK,Write,OK,00000100,4;");
    assert_eq!(bob.reply(), "OK,Write,OK,00000200,4;");

    assert_eq!(bob.command("Read,100,4;"), "OK,Read,OK,00000100,4,AAAAAAAA;");
    assert_eq!(alice.command("Read,200,4;"), "OK,Read,OK,00000200,4,BBBBBBBB;");
}

#[test]
fn disconnecting_mid_access_does_not_stall_others() {
    let mut config = test_config();
    config.memory.read_latency = 50;
    let platform = TestPlatform::start(config);

    let mut leaver = platform.connect();
    leaver.send("Read,0,4096;");
    drop(leaver);

    let mut stayer = platform.connect();
    assert_eq!(stayer.command("Write,0,1,11;"), "OK,Write,OK,00000000,1;");
}

#[test]
fn stop_ends_the_simulation() {
    let platform = TestPlatform::start(test_config());
    let mut client = platform.connect();

    assert_eq!(client.command("Stop;"), "OK,Stop;");
    let stats = platform.join().unwrap();
    assert_eq!(stats.stopped_by.as_deref(), Some("debug"));
    assert!(stats.cycles > 0);
}
