//! Several host threads taking turns on one interpreter.

use std::thread;

use pyembed_runtime::prelude::*;
use pyembed_runtime::{Interpreter, Result, Value, module_from_source};

fn main() -> Result<()> {
    let interpreter = Interpreter::initialize()?;
    let module = module_from_source(
        "handoff",
        "import threading\nseen = []\ndef visit(worker):\n    seen.append((worker, threading.get_ident()))\n",
    )?;
    let visit = module.get_attr("visit")?;

    interpreter.allow_threads(|| {
        thread::scope(|scope| {
            for worker in 0..4 {
                let interpreter = &interpreter;
                let visit = &visit;
                scope.spawn(move || {
                    for _ in 0..3 {
                        let gil = interpreter.ensure_gil();
                        if let Err(err) = visit.call([Value::from(worker)]) {
                            eprintln!("worker {worker}: {err}");
                        }
                        gil.release();
                    }
                });
            }
        });
    });

    let seen = module.get_attr("seen")?;
    println!("{} visits: {seen}", seen.len()?);

    drop((visit, seen, module));
    interpreter.finalize()
}
