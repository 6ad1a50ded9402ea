//==================================================
// File: binder/native.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Bind call arguments to native routine slots
// Objective: Match keywords against the routine's descriptor, fill positional
//            slots, fold mode keywords into the call's mode word and pack
//            the variadic tail, then invoke the entry point
//==================================================

use tracing::debug;

use super::keywords::KeywordEntry;
use crate::interpreter::errors::{ArityProblem, EngineError, EngineResult};
use crate::interpreter::Interpreter;
use crate::native::{CallModes, NativeArgs, NativeId, NativeRoutine};
use crate::symbol::{SymbolIndex, SymbolValue};

/// One binding step, recorded in argument order so evaluation stays
/// left-to-right.
#[derive(Debug, Clone, Copy)]
enum Action {
    Slot { slot: usize, argument: SymbolIndex },
    Flag { slot: usize, set: bool },
    Tail(SymbolIndex),
    Mode {
        mask: u32,
        value: Option<SymbolIndex>,
        inverted: bool,
    },
}

impl Interpreter {
    //==================================================
    // Section 1.0 - Call Entry
    //==================================================

    /// Bind `args` and run the native entry point inside its own call frame.
    pub(crate) fn call_native(
        &mut self,
        id: NativeId,
        args: &[SymbolIndex],
    ) -> EngineResult<Option<SymbolIndex>> {
        if self.state.return_all {
            return Err(EngineError::Aborted);
        }
        let natives = self.natives;
        let routine = natives.routine(id)?;
        let bound = self.bind_native(routine, args)?;
        let entry = routine.entry;
        self.with_call_frame(|this| this.nested(|this| entry(this, &bound)))
    }

    //==================================================
    // Section 2.0 - Binding
    //==================================================

    pub(crate) fn bind_native(
        &mut self,
        routine: &NativeRoutine,
        args: &[SymbolIndex],
    ) -> EngineResult<NativeArgs> {
        let width = if routine.variadic {
            routine.max_args.max(1)
        } else {
            routine.max_args
        };
        let actions = self.plan_native(routine, args, width)?;

        let mut slots: Vec<Option<SymbolIndex>> = vec![None; width];
        let mut tail = Vec::new();
        let mut modes = CallModes::new(routine.default_modes);
        for action in actions {
            match action {
                Action::Slot { slot, argument } => {
                    let preserved = !routine.evaluate_args || routine.keywords.slot_preserved(slot);
                    slots[slot] = Some(if preserved {
                        argument
                    } else {
                        self.bind_value(argument)?
                    });
                }
                Action::Flag { slot, set } => slots[slot] = Some(self.flag_value(set)?),
                Action::Tail(argument) => tail.push(if routine.evaluate_args {
                    self.bind_value(argument)?
                } else {
                    argument
                }),
                Action::Mode {
                    mask,
                    value,
                    inverted,
                } => {
                    if self.keyword_truth(value)? != inverted {
                        modes.set(mask);
                    } else {
                        modes.clear(mask);
                    }
                }
            }
        }
        if !tail.is_empty() {
            slots[width - 1] = Some(self.store.allocate_temp(SymbolValue::CompactList(tail))?);
        }
        if routine.trim_trailing {
            while slots.last() == Some(&None) {
                slots.pop();
            }
        }
        debug!(
            routine = routine.name,
            bound = slots.iter().filter(|slot| slot.is_some()).count(),
            modes = modes.bits(),
            "bound native call"
        );
        Ok(NativeArgs { slots, modes })
    }

    /// Structural pass: resolve every keyword and position without
    /// evaluating anything, so a bad call fails before side effects.
    fn plan_native(
        &self,
        routine: &NativeRoutine,
        args: &[SymbolIndex],
        width: usize,
    ) -> EngineResult<Vec<Action>> {
        let mut bound = vec![false; width];
        let mut actions = Vec::with_capacity(args.len());
        let mut position = routine.positional_offset;
        let mut tail_len = 0;
        let claim = |slot: usize, bound: &mut Vec<bool>| -> EngineResult<()> {
            if std::mem::replace(&mut bound[slot], true) {
                return Err(EngineError::arity(
                    routine.name,
                    ArityProblem::Duplicate {
                        slot: routine.slot_name(slot),
                    },
                ));
            }
            Ok(())
        };

        for &argument in args {
            let keyword = match self.store.value(argument)? {
                SymbolValue::Keyword(keyword) => keyword.clone(),
                _ => {
                    if routine.variadic && position + 1 >= width {
                        tail_len += 1;
                        actions.push(Action::Tail(argument));
                    } else if position >= width {
                        return Err(EngineError::arity(
                            routine.name,
                            ArityProblem::TooMany {
                                max: width,
                                given: position + 1,
                            },
                        ));
                    } else {
                        claim(position, &mut bound)?;
                        actions.push(Action::Slot {
                            slot: position,
                            argument,
                        });
                    }
                    position += 1;
                    continue;
                }
            };
            let Some((entry, inverted)) = routine.keywords.lookup(&keyword.name) else {
                return Err(EngineError::UnknownKeyword {
                    routine: routine.name.to_string(),
                    keyword: keyword.name,
                });
            };
            match entry {
                KeywordEntry::Mode { mask, .. } => actions.push(Action::Mode {
                    mask: *mask,
                    value: keyword.value,
                    inverted,
                }),
                KeywordEntry::Slot { slot, .. } => {
                    claim(*slot, &mut bound)?;
                    actions.push(match (keyword.value, inverted) {
                        (Some(argument), false) => Action::Slot {
                            slot: *slot,
                            argument,
                        },
                        (None, false) => Action::Flag {
                            slot: *slot,
                            set: true,
                        },
                        (_, true) => Action::Flag {
                            slot: *slot,
                            set: false,
                        },
                    });
                }
            }
        }

        if tail_len > 0 && bound[width - 1] {
            return Err(EngineError::arity(
                routine.name,
                ArityProblem::Duplicate {
                    slot: routine.slot_name(width - 1),
                },
            ));
        }
        let filled = bound.iter().filter(|slot| **slot).count() + usize::from(tail_len > 0);
        if filled < routine.min_args {
            return Err(EngineError::arity(
                routine.name,
                ArityProblem::TooFew {
                    min: routine.min_args,
                    given: filled,
                },
            ));
        }
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Arg, Expr};
    use crate::symbol::{BinaryOp, Scalar};

    fn noop(_: &mut Interpreter, _: &NativeArgs) -> EngineResult<Option<SymbolIndex>> {
        Ok(None)
    }

    fn setup() -> (Interpreter, SymbolIndex, SymbolIndex) {
        let mut interp = Interpreter::default();
        let a = interp
            .set_variable("a", SymbolValue::Scalar(Scalar::Long(1)))
            .expect("a");
        let b = interp
            .set_variable("b", SymbolValue::Scalar(Scalar::Long(2)))
            .expect("b");
        (interp, a, b)
    }

    fn bind(interp: &mut Interpreter, routine: &NativeRoutine, args: &[Arg]) -> EngineResult<NativeArgs> {
        let args = interp.compile_args(args).expect("compile");
        interp.bind_native(routine, &args)
    }

    #[test]
    fn modes_take_no_slot_regardless_of_order() {
        let (mut interp, a, b) = setup();
        let routine = NativeRoutine::function("F", 2, "x y 8mode", noop);
        let bound = bind(
            &mut interp,
            &routine,
            &[
                Arg::pos(Expr::var("a")),
                Arg::key("mode", Expr::Long(3)),
                Arg::pos(Expr::var("b")),
            ],
        )
        .expect("bind");
        assert_eq!(bound.get(0), Some(a));
        assert_eq!(bound.get(1), Some(b));
        assert!(bound.modes.contains(8));
    }

    #[test]
    fn a_slot_bound_twice_is_rejected() {
        let (mut interp, _, _) = setup();
        let routine = NativeRoutine::function("F", 0, "x y", noop);
        let err = bind(
            &mut interp,
            &routine,
            &[Arg::pos(Expr::var("a")), Arg::key("x", Expr::var("b"))],
        )
        .expect_err("duplicate");
        assert_eq!(
            err,
            EngineError::arity("F", ArityProblem::Duplicate { slot: "X".into() })
        );
    }

    #[test]
    fn arity_and_unknown_keywords_fail_before_evaluation() {
        let (mut interp, _, _) = setup();
        let routine = NativeRoutine::function("F", 2, "x y", noop);
        let too_few = bind(&mut interp, &routine, &[Arg::pos(Expr::var("a"))]);
        assert!(matches!(
            too_few,
            Err(EngineError::Arity { problem: ArityProblem::TooFew { min: 2, given: 1 }, .. })
        ));
        let too_many = bind(
            &mut interp,
            &routine,
            &[
                Arg::pos(Expr::Long(1)),
                Arg::pos(Expr::Long(2)),
                Arg::pos(Expr::var("never_defined")),
            ],
        );
        assert!(matches!(
            too_many,
            Err(EngineError::Arity { problem: ArityProblem::TooMany { max: 2, given: 3 }, .. })
        ));
        let unknown = bind(&mut interp, &routine, &[Arg::flag("bogus")]);
        assert!(matches!(unknown, Err(EngineError::UnknownKeyword { .. })));
    }

    #[test]
    fn inverted_and_bare_flags_bind_long_values() {
        let (mut interp, _, _) = setup();
        let routine = NativeRoutine::function("F", 0, "verbose quiet 1fast", noop)
            .with_default_modes(1);
        let bound = bind(
            &mut interp,
            &routine,
            &[Arg::flag("noverbose"), Arg::flag("qu"), Arg::flag("nofast")],
        )
        .expect("bind");
        let value = |slot: usize| interp.store.value(bound.get(slot).expect("bound")).cloned();
        assert_eq!(value(0).expect("v"), SymbolValue::Scalar(Scalar::Long(0)));
        assert_eq!(value(1).expect("q"), SymbolValue::Scalar(Scalar::Long(1)));
        assert!(!bound.modes.contains(1));
    }

    #[test]
    fn variadic_tail_packs_into_the_last_slot() {
        let (mut interp, a, _) = setup();
        let routine = NativeRoutine::subroutine("P", 1, "items", noop).variadic();
        let bound = bind(
            &mut interp,
            &routine,
            &[
                Arg::pos(Expr::var("a")),
                Arg::pos(Expr::Long(5)),
                Arg::pos(Expr::str("x")),
            ],
        )
        .expect("bind");
        let list = bound.get(0).expect("tail");
        match interp.store.value(list).expect("list") {
            SymbolValue::CompactList(items) => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[0], a);
                assert!(items[1].is_temp());
            }
            other => panic!("expected a compact list, got {other:?}"),
        }
    }

    #[test]
    fn preserved_slots_and_unevaluated_routines_see_the_raw_argument() {
        let (mut interp, _, _) = setup();
        let sum = || Arg::pos(Expr::binary(BinaryOp::Add, Expr::var("a"), Expr::Long(1)));
        let args = interp.compile_args(&[sum(), sum()]).expect("compile");

        let preserving = NativeRoutine::function("F", 0, "x* y", noop);
        let bound = interp.bind_native(&preserving, &args).expect("bind");
        assert_eq!(bound.get(0), Some(args[0]));
        let evaluated = bound.get(1).expect("y");
        assert!(evaluated.is_temp());
        assert_eq!(
            interp.store.value(evaluated).expect("value"),
            &SymbolValue::Scalar(Scalar::Long(2))
        );

        let raw = NativeRoutine::function("G", 0, "x y", noop).unevaluated();
        let bound = interp.bind_native(&raw, &args).expect("bind");
        assert_eq!(bound.get(0), Some(args[0]));
        assert_eq!(bound.get(1), Some(args[1]));
    }

    #[test]
    fn positional_offset_and_trimming() {
        let (mut interp, a, _) = setup();
        let routine = NativeRoutine::function("F", 0, "x y z", noop)
            .with_offset(1)
            .trimmed();
        let bound = bind(&mut interp, &routine, &[Arg::pos(Expr::var("a"))]).expect("bind");
        assert_eq!(bound.len(), 2);
        assert_eq!(bound.get(0), None);
        assert_eq!(bound.get(1), Some(a));
    }
}

//==================================================
// End of file
//==================================================
