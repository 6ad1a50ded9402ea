//==================================================
// File: binder/user.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Bind call arguments to user routine parameters
// Objective: Evaluate every argument first, then rebind each parameter
//            transfer for the duration of the body and restore the previous
//            bindings on every exit path
//==================================================

use tracing::debug;

use super::keywords::match_keyword;
use crate::interpreter::errors::{ArityProblem, EngineError, EngineResult, Flow};
use crate::interpreter::Interpreter;
use crate::symbol::{Routine, RoutineKind, SymbolIndex, SymbolValue};

/// Where an argument goes, decided before anything is evaluated.
#[derive(Debug, Clone, Copy)]
enum Binding {
    Param { param: usize, argument: SymbolIndex },
    Flag { param: usize, set: bool },
    Tail(SymbolIndex),
}

fn kind_label(kind: RoutineKind) -> &'static str {
    match kind {
        RoutineKind::Subroutine => "a subroutine",
        RoutineKind::Function => "a function",
        RoutineKind::Block => "a block routine",
    }
}

impl Interpreter {
    //==================================================
    // Section 1.0 - Call Entry
    //==================================================

    /// Call a user routine. Functions hand back their (unpinned) result;
    /// subroutines and blocks return `None`.
    pub(crate) fn call_user(
        &mut self,
        index: SymbolIndex,
        args: &[SymbolIndex],
        expected: RoutineKind,
    ) -> EngineResult<Option<SymbolIndex>> {
        if self.state.return_all {
            return Err(EngineError::Aborted);
        }
        let routine = self.ensure_routine(index)?;
        let name = self.store.describe(index);
        if routine.kind != expected {
            return Err(EngineError::IllegalClass {
                what: name,
                class: self.store.class(index)?,
                expected: kind_label(expected),
            });
        }

        let plan = self.plan_user(&name, &routine, args)?;
        let values = self.evaluate_bindings(&routine, plan)?;
        let (saved, dangling) = self.rebind_params(&routine, values)?;
        debug!(routine = %name, args = args.len(), depth = self.state.nesting, "enter routine");

        let outcome = self.with_call_frame(|this| {
            let flow = this.nested(|this| this.run_body(&routine.body));
            let returned = this.take_pending_return();
            flow.map(|flow| (flow, returned))
        });

        self.restore_params(&routine, saved);
        for temp in dangling {
            let _ = self.store.release_if_free_temp(temp);
        }

        let (flow, returned) = outcome?;
        if flow == Flow::ReturnAll || self.state.return_all {
            if let Some(value) = returned {
                let _ = self.store.release_if_free_temp(value);
            }
            return Err(EngineError::Aborted);
        }
        match (expected, returned) {
            (RoutineKind::Function, returned) => Ok(returned),
            (_, Some(value)) => {
                let _ = self.store.release_if_free_temp(value);
                Ok(None)
            }
            (_, None) => Ok(None),
        }
    }

    fn run_body(&mut self, body: &[SymbolIndex]) -> EngineResult<Flow> {
        for statement in body {
            match self.execute(*statement)? {
                Flow::Normal => {}
                flow @ (Flow::Return | Flow::ReturnAll) => return Ok(flow),
                flow @ (Flow::Break | Flow::Continue) => {
                    debug!(?flow, "loop signal outside a loop ignored");
                }
            }
        }
        Ok(Flow::Normal)
    }

    //==================================================
    // Section 2.0 - Binding Plan
    //==================================================

    /// Match every argument to a parameter without evaluating anything;
    /// conflicts fail here, before the frame is touched.
    fn plan_user(
        &self,
        name: &str,
        routine: &Routine,
        args: &[SymbolIndex],
    ) -> EngineResult<Vec<Binding>> {
        let names: Vec<String> = routine
            .params
            .iter()
            .map(|param| self.store.describe(*param))
            .collect();
        let count = names.len();
        let mut bound = vec![false; count];
        let mut plan = Vec::with_capacity(args.len());
        let mut position = 0;
        let mut tail_len = 0;

        let claim = |param: usize, bound: &mut Vec<bool>| -> EngineResult<()> {
            if std::mem::replace(&mut bound[param], true) {
                return Err(EngineError::arity(
                    name,
                    ArityProblem::Duplicate {
                        slot: names[param].clone(),
                    },
                ));
            }
            Ok(())
        };

        for &argument in args {
            let keyword = match self.store.value(argument)? {
                SymbolValue::Keyword(keyword) => keyword.clone(),
                _ => {
                    if routine.variadic && position + 1 >= count {
                        tail_len += 1;
                        plan.push(Binding::Tail(argument));
                    } else if position >= count {
                        return Err(EngineError::arity(
                            name,
                            ArityProblem::TooMany {
                                max: count,
                                given: position + 1,
                            },
                        ));
                    } else {
                        claim(position, &mut bound)?;
                        plan.push(Binding::Param {
                            param: position,
                            argument,
                        });
                    }
                    position += 1;
                    continue;
                }
            };
            let Some(found) = match_keyword(names.iter().map(String::as_str), &keyword.name) else {
                return Err(EngineError::UnknownKeyword {
                    routine: name.to_string(),
                    keyword: keyword.name,
                });
            };
            claim(found.position, &mut bound)?;
            plan.push(match (keyword.value, found.inverted) {
                (Some(argument), false) => Binding::Param {
                    param: found.position,
                    argument,
                },
                (None, false) => Binding::Flag {
                    param: found.position,
                    set: true,
                },
                (_, true) => Binding::Flag {
                    param: found.position,
                    set: false,
                },
            });
        }
        if tail_len > 0 && bound[count - 1] {
            return Err(EngineError::arity(
                name,
                ArityProblem::Duplicate {
                    slot: names[count - 1].clone(),
                },
            ));
        }
        Ok(plan)
    }

    /// Evaluate every planned argument in order. Nothing is rebound yet, so
    /// an argument mentioning a parameter sees the caller's binding.
    fn evaluate_bindings(
        &mut self,
        routine: &Routine,
        plan: Vec<Binding>,
    ) -> EngineResult<Vec<Option<SymbolIndex>>> {
        let mut values = vec![None; routine.params.len()];
        let mut tail = Vec::new();
        for binding in plan {
            match binding {
                Binding::Param { param, argument } => values[param] = Some(self.bind_value(argument)?),
                Binding::Flag { param, set } => values[param] = Some(self.flag_value(set)?),
                Binding::Tail(argument) => tail.push(self.bind_value(argument)?),
            }
        }
        if !tail.is_empty() {
            if let Some(last) = values.last_mut() {
                *last = Some(self.store.allocate_temp(SymbolValue::CompactList(tail))?);
            }
        }
        Ok(values)
    }

    //==================================================
    // Section 3.0 - Frame Rebinding
    //==================================================

    /// Snapshot each parameter and point it at its argument. Omitted
    /// parameters become `Undefined`. An argument that is itself one of this
    /// routine's parameters is replaced by a fresh placeholder, since the
    /// parameter is about to be rebound; those placeholders are returned so
    /// the caller can free them afterwards.
    fn rebind_params(
        &mut self,
        routine: &Routine,
        values: Vec<Option<SymbolIndex>>,
    ) -> EngineResult<(Vec<SymbolValue>, Vec<SymbolIndex>)> {
        let mut dangling = Vec::new();
        let mut targets = Vec::with_capacity(values.len());
        for value in values {
            targets.push(match value {
                Some(value) if routine.params.contains(&value) => {
                    let placeholder = self.store.allocate_temp(SymbolValue::Undefined)?;
                    dangling.push(placeholder);
                    Some(placeholder)
                }
                other => other,
            });
        }

        let mut saved = Vec::with_capacity(routine.params.len());
        for (param, target) in routine.params.iter().zip(targets) {
            let previous = match self.store.take_value(*param) {
                Ok(previous) => previous,
                Err(error) => {
                    self.restore_params(routine, saved);
                    return Err(error);
                }
            };
            saved.push(previous);
            let rebound = match target {
                Some(target) => SymbolValue::Transfer(Some(target)),
                None => SymbolValue::Undefined,
            };
            self.store.set_value(*param, rebound)?;
        }
        Ok((saved, dangling))
    }

    /// Put back the snapshots taken by `rebind_params`, in order.
    fn restore_params(&mut self, routine: &Routine, saved: Vec<SymbolValue>) {
        for (param, previous) in routine.params.iter().zip(saved) {
            let _ = self.store.set_value(*param, previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::image::{Arg, Expr, ProgramImage, RoutineImage, Stmt};
    use crate::interpreter::errors::{ArityProblem, EngineError};
    use crate::interpreter::Interpreter;
    use crate::symbol::{BinaryOp, RoutineKind, Scalar, SymbolValue};

    fn load(interp: &mut Interpreter, routine: RoutineImage) {
        interp
            .load_image(&ProgramImage::new().routine(routine))
            .expect("load");
    }

    #[test]
    fn keywords_bind_by_abbreviation_and_inversion() {
        let mut interp = Interpreter::default();
        load(
            &mut interp,
            RoutineImage::function(
                "pick",
                &["value", "verbose"],
                vec![Stmt::ret(Some(Expr::binary(
                    BinaryOp::Add,
                    Expr::var("value"),
                    Expr::var("verbose"),
                )))],
            ),
        );
        let call = |args| Expr::call("pick", args);
        assert_eq!(
            interp
                .eval(&call(vec![Arg::pos(Expr::Long(10)), Arg::flag("verb")]))
                .expect("flag"),
            SymbolValue::Scalar(Scalar::Long(11))
        );
        assert_eq!(
            interp
                .eval(&call(vec![Arg::flag("noverbose"), Arg::key("val", Expr::Long(4))]))
                .expect("inverted"),
            SymbolValue::Scalar(Scalar::Long(4))
        );
    }

    #[test]
    fn duplicate_bindings_leave_parameters_untouched() {
        let mut interp = Interpreter::default();
        load(
            &mut interp,
            RoutineImage::subroutine("setter", &["x"], vec![Stmt::assign("x", Expr::Long(99))]),
        );
        interp
            .set_variable("a", SymbolValue::Scalar(Scalar::Long(1)))
            .expect("a");
        let report = interp
            .run_image(&ProgramImage::new().statement(Stmt::call(
                "setter",
                vec![Arg::pos(Expr::var("a")), Arg::key("x", Expr::var("a"))],
            )))
            .expect("run");
        assert_eq!(report.errors.len(), 1);
        assert_eq!(interp.scalar("a"), Some(Scalar::Long(1)));

        let err = interp
            .execute_inserted(&Stmt::call(
                "setter",
                vec![Arg::key("x", Expr::Long(1)), Arg::key("x", Expr::Long(2))],
            ))
            .expect_err("duplicate keyword");
        assert!(matches!(
            err,
            EngineError::Arity { problem: ArityProblem::Duplicate { .. }, .. }
        ));
    }

    #[test]
    fn output_parameters_write_through_to_the_caller() {
        let mut interp = Interpreter::default();
        load(
            &mut interp,
            RoutineImage::subroutine("fill", &["out"], vec![Stmt::assign("out", Expr::Double(2.5))]),
        );
        let report = interp
            .run_image(&ProgramImage::new().statement(Stmt::call(
                "fill",
                vec![Arg::pos(Expr::var("result"))],
            )))
            .expect("run");
        assert!(report.is_success(), "{:?}", report.errors);
        assert_eq!(interp.scalar("result"), Some(Scalar::Double(2.5)));
    }

    #[test]
    fn variadic_routines_collect_extra_arguments_in_the_last_parameter() {
        let mut interp = Interpreter::default();
        load(
            &mut interp,
            RoutineImage::function(
                "spread",
                &["first", "rest"],
                vec![Stmt::ret(Some(Expr::binary(
                    BinaryOp::Add,
                    Expr::binary(
                        BinaryOp::Mul,
                        Expr::call("num_elem", vec![Arg::pos(Expr::var("rest"))]),
                        Expr::var("first"),
                    ),
                    Expr::extract(Expr::var("rest"), vec![Expr::Long(1)]),
                )))],
            )
            .variadic(),
        );
        let value = interp
            .eval(&Expr::call(
                "spread",
                vec![
                    Arg::pos(Expr::Long(100)),
                    Arg::pos(Expr::Long(20)),
                    Arg::pos(Expr::Long(30)),
                ],
            ))
            .expect("variadic call");
        assert_eq!(value, SymbolValue::Scalar(Scalar::Long(230)));

        let err = interp
            .eval(&Expr::call(
                "spread",
                vec![
                    Arg::pos(Expr::Long(1)),
                    Arg::pos(Expr::Long(2)),
                    Arg::key("rest", Expr::Long(3)),
                ],
            ))
            .expect_err("tail and keyword");
        assert!(matches!(
            err,
            EngineError::Arity { problem: ArityProblem::Duplicate { .. }, .. }
        ));
        assert_eq!(interp.store.live_temps(), 0);
    }

    #[test]
    fn calling_a_subroutine_as_a_function_is_rejected() {
        let mut interp = Interpreter::default();
        load(&mut interp, RoutineImage::subroutine("proc", &[], vec![]));
        let pointer = Expr::RoutineRef {
            name: "proc".into(),
            kind: RoutineKind::Subroutine,
        };
        let err = interp
            .eval(&Expr::CallPointer {
                pointer: Box::new(pointer),
                args: vec![],
            })
            .expect_err("kind");
        assert!(matches!(err, EngineError::IllegalClass { .. }));
    }
}

//==================================================
// End of file
//==================================================
