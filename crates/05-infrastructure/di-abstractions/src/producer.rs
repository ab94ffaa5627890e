//! 生产者函数抽象
//!
//! 任何 `Fn(A1, .., An) -> Result<R, E>`（n 不超过 8，每个参数实现 [`Params`]）
//! 都是生产者。参数描述在注册时一次性算出，调用时按同样顺序消费实参。

use crate::param::{Arguments, ParamList, Params};
use di_common::{BoxError, DigError, DigResult};

/// 调用生产者时的失败
#[derive(Debug)]
pub enum CallError {
    /// 实参无法还原为参数类型
    Arguments(DigError),
    /// 生产者自身返回了错误
    Failed(BoxError),
}

/// 生产者函数
pub trait Producer<Args> {
    /// 成功时的返回值类型
    type Output;

    /// 参数描述列表
    fn param_list() -> DigResult<ParamList>;

    /// 用解析好的实参调用
    fn produce(&self, args: &mut Arguments) -> Result<Self::Output, CallError>;
}

macro_rules! impl_producer {
    ($($arg:ident),*) => {
        impl<Func, Out, Err, $($arg,)*> Producer<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Result<Out, Err>,
            Err: Into<BoxError>,
            $($arg: Params,)*
        {
            type Output = Out;

            #[allow(unused_mut)]
            fn param_list() -> DigResult<ParamList> {
                let mut list = ParamList::new();
                $( <$arg as Params>::collect(&mut list)?; )*
                Ok(list)
            }

            #[allow(non_snake_case, unused_variables)]
            fn produce(&self, args: &mut Arguments) -> Result<Out, CallError> {
                $( let $arg = <$arg as Params>::extract(args).map_err(CallError::Arguments)?; )*
                (self)($($arg),*).map_err(|err| CallError::Failed(err.into()))
            }
        }
    };
}

impl_producer!();
impl_producer!(A1);
impl_producer!(A1, A2);
impl_producer!(A1, A2, A3);
impl_producer!(A1, A2, A3, A4);
impl_producer!(A1, A2, A3, A4, A5);
impl_producer!(A1, A2, A3, A4, A5, A6);
impl_producer!(A1, A2, A3, A4, A5, A6, A7);
impl_producer!(A1, A2, A3, A4, A5, A6, A7, A8);
