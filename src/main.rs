#![cfg_attr(target_arch = "avr", no_std)]
#![cfg_attr(target_arch = "avr", no_main)]
#![cfg_attr(target_arch = "avr", feature(abi_avr_interrupt))]

#[cfg(target_arch = "avr")]
mod firmware {
    use panic_halt as _;

    use avr_device::atmega128a::{Peripherals, PORTB};
    use avr_device::interrupt::{self, Mutex};
    use core::cell::{Cell, RefCell};
    use ufmt::uwrite;

    use atmega128_sched::config;
    use atmega128_sched::drivers::SerialConsole;
    use atmega128_sched::hal::{TickConfig, TickTimer, Usart0};
    use atmega128_sched::rtos::{IsrScheduler, TaskBuilder, TaskId};

    const LED_PIN: u8 = 1 << 0;
    const BLINK_RUN_MS: u32 = 30_000;

    const TICK: TickConfig =
        match TickConfig::for_period(config::CPU_FREQ_HZ, config::TICK_PERIOD_MS) {
            Some(tick) => tick,
            None => panic!("TICK_PERIOD_MS is out of range for Timer0"),
        };

    static SCHEDULER: IsrScheduler = IsrScheduler::interrupt_safe(config::TICK_PERIOD_MS);

    // Only touched from main-loop context; the Mutex makes the static Sync
    static CONSOLE: Mutex<RefCell<Option<SerialConsole<Usart0>>>> =
        Mutex::new(RefCell::new(None));
    static BLINK_TASK: Mutex<Cell<Option<TaskId>>> = Mutex::new(Cell::new(None));

    #[avr_device::interrupt(atmega128a)]
    fn TIMER0_COMP() {
        SCHEDULER.tick();
    }

    #[avr_device::entry]
    fn main() -> ! {
        let dp = Peripherals::take().unwrap();

        dp.PORTB.ddrb.write(|w| unsafe { w.bits(LED_PIN) });

        let console = SerialConsole::new(Usart0::new(dp.USART0, config::UART_BAUD));
        interrupt::free(|cs| CONSOLE.borrow(cs).replace(Some(console)));

        SCHEDULER.init();

        let blink = TaskBuilder::new()
            .callback(&blink_led)
            .period(config::LED_BLINK_MS)
            .build(&SCHEDULER);
        match blink {
            Ok(id) => interrupt::free(|cs| BLINK_TASK.borrow(cs).set(Some(id))),
            Err(e) => report("blink", e),
        }

        let tasks: [(&'static (dyn Fn() + Sync), u32, u32); 3] = [
            (&heartbeat, config::HEARTBEAT_MS, config::HEARTBEAT_MS),
            (&banner, 100, 0),
            (&stop_blink, BLINK_RUN_MS, 0),
        ];
        for (callback, delay_ms, period_ms) in tasks {
            if let Err(e) = SCHEDULER.add_task(callback, delay_ms, period_ms) {
                report("startup", e);
            }
        }

        let mut timer = TickTimer::new(dp.TC0);
        timer.start(TICK);

        // Enable interrupts globally
        unsafe { interrupt::enable() };

        SCHEDULER.run(avr_device::asm::sleep)
    }

    /// Borrow the console outside any critical section. Serial output at
    /// 9600 baud is far too slow to hold interrupts off for.
    fn with_console<F: FnOnce(&mut SerialConsole<Usart0>)>(f: F) {
        let Some(mut console) = interrupt::free(|cs| CONSOLE.borrow(cs).take()) else {
            return;
        };
        f(&mut console);
        interrupt::free(|cs| CONSOLE.borrow(cs).replace(Some(console)));
    }

    fn report(what: &str, err: atmega128_sched::rtos::SchedulerError) {
        with_console(|console| {
            uwrite!(console, "[ERR] {}: {}\r\n", what, err).ok();
        });
    }

    fn blink_led() {
        unsafe {
            (*PORTB::ptr())
                .portb
                .modify(|r, w| w.bits(r.bits() ^ LED_PIN));
        }
    }

    fn heartbeat() {
        let stats = SCHEDULER.stats();
        with_console(|console| {
            uwrite!(
                console,
                "uptime {} ticks, {} runs, {} tasks, {} overruns\r\n",
                stats.ticks,
                stats.runs,
                SCHEDULER.len() as u32,
                stats.overruns
            )
            .ok();
        });
    }

    fn banner() {
        with_console(|console| {
            console.write_line("ATmega128 scheduler v0.1.0").ok();
            uwrite!(
                console,
                "{} ms tick, {} slots\r\n",
                SCHEDULER.tick_period_ms(),
                SCHEDULER.capacity() as u32
            )
            .ok();
        });
    }

    fn stop_blink() {
        let Some(id) = interrupt::free(|cs| BLINK_TASK.borrow(cs).take()) else {
            return;
        };
        if let Err(e) = SCHEDULER.delete_task(id) {
            report("stop blink", e);
            return;
        }
        unsafe {
            (*PORTB::ptr())
                .portb
                .modify(|r, w| w.bits(r.bits() & !LED_PIN));
        }
        with_console(|console| {
            console.write_line("blink stopped").ok();
        });
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {
    eprintln!("atmega128_sched is firmware; build it for an AVR target (avr-atmega128)");
}
