//! ErgoDox matrix firmware for ATmega32U4 (Teensy 2.0).
//!
//! Runs the debounced matrix scan for both halves:
//! - Left half via the MCP23018 I/O expander on I2C
//! - Right half via Teensy GPIO
//!
//! The board LED is lit while any key is held.

#![no_std]
#![no_main]
#![feature(asm_experimental_arch)]

mod clock;
mod delay;
mod leds;
mod pins;
mod twi;

use avr_device::atmega32u4::Peripherals;
use ergodox_matrix::Scanner;

use clock::Timer3;
use delay::delay_ms;
use leds::Leds;
use pins::Pins;
use twi::Twi;

/// Panic handler: on AVR we just loop forever.
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

/// Main entry point.
#[no_mangle]
pub extern "C" fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    // Disable clock prescaler (CLKPR)
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) }); // Prescaler = 1

    let twi = Twi::new(&dp.TWI);
    // Give the left half time to power up before talking to it.
    delay_ms(1000);

    let mut scanner: Scanner<_, _, _> = Scanner::new(twi, Pins::new(&dp), Leds::new(&dp));
    scanner.initialize();
    let mut clock = Timer3::new(&dp.TC3);

    loop {
        if scanner.scan_timed(&mut clock) {
            let any_down = scanner.pressed_count() > 0;
            scanner.indicator_mut().set_board(any_down);
        }

        delay_ms(1);
    }
}
