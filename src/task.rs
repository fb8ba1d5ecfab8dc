use super::{
    errors::SpawnError,
    result::SpawnResult,
};
use std::{
    fmt::Display,
    marker::PhantomData,
};


/// Интерфейс исполняемой функции.
///
/// Функция принимает ноль или один аргумент: `None` означает вызов без аргументов.
/// Значение разделяется между задачами через `Arc`, поэтому должно быть `Send + Sync`.
pub trait Callable<A>: Send + Sync + 'static {
    type Output: Send + 'static;

    fn call(&self, arg: Option<A>) -> SpawnResult<Self::Output>;
}


/// Функция строго с одним аргументом
pub struct Unary<F, A, R> {
    f: F,
    _marker: PhantomData<fn(A) -> R>,
}

pub fn unary<F, A, R>(f: F) -> Unary<F, A, R>
where
    F: Fn(A) -> R + Send + Sync + 'static,
{
    Unary { f, _marker: PhantomData }
}

impl<F, A, R> Callable<A> for Unary<F, A, R>
where
    F: Fn(A) -> R + Send + Sync + 'static,
    A: 'static,
    R: Send + 'static,
{
    type Output = R;

    #[inline]
    fn call(&self, arg: Option<A>) -> SpawnResult<R> {
        match arg {
            Some(a) => Ok((self.f)(a)),
            None => Err(SpawnError::ArityMismatch { expected: 1, provided: 0 }),
        }
    }
}


/// Функция без аргументов
pub struct Nullary<F, A, R> {
    f: F,
    _marker: PhantomData<fn(A) -> R>,
}

pub fn nullary<F, A, R>(f: F) -> Nullary<F, A, R>
where
    F: Fn() -> R + Send + Sync + 'static,
{
    Nullary { f, _marker: PhantomData }
}

impl<F, A, R> Callable<A> for Nullary<F, A, R>
where
    F: Fn() -> R + Send + Sync + 'static,
    A: 'static,
    R: Send + 'static,
{
    type Output = R;

    #[inline]
    fn call(&self, arg: Option<A>) -> SpawnResult<R> {
        match arg {
            None => Ok((self.f)()),
            Some(_) => Err(SpawnError::ArityMismatch { expected: 0, provided: 1 }),
        }
    }
}


/// Функция с необязательным аргументом, принимает обе формы вызова
pub struct Optional<F, A, R> {
    f: F,
    _marker: PhantomData<fn(A) -> R>,
}

pub fn optional<F, A, R>(f: F) -> Optional<F, A, R>
where
    F: Fn(Option<A>) -> R + Send + Sync + 'static,
{
    Optional { f, _marker: PhantomData }
}

impl<F, A, R> Callable<A> for Optional<F, A, R>
where
    F: Fn(Option<A>) -> R + Send + Sync + 'static,
    A: 'static,
    R: Send + 'static,
{
    type Output = R;

    #[inline]
    fn call(&self, arg: Option<A>) -> SpawnResult<R> {
        Ok((self.f)(arg))
    }
}


/// Функция с одним аргументом, которая может вернуть ошибку.
/// `Err(e)` превращается в `SpawnError::Failed(e.to_string())`.
pub struct Fallible<F, A, R, E> {
    f: F,
    _marker: PhantomData<fn(A) -> Result<R, E>>,
}

pub fn fallible<F, A, R, E>(f: F) -> Fallible<F, A, R, E>
where
    F: Fn(A) -> Result<R, E> + Send + Sync + 'static,
    E: Display,
{
    Fallible { f, _marker: PhantomData }
}

impl<F, A, R, E> Callable<A> for Fallible<F, A, R, E>
where
    F: Fn(A) -> Result<R, E> + Send + Sync + 'static,
    A: 'static,
    R: Send + 'static,
    E: Display + 'static,
{
    type Output = R;

    fn call(&self, arg: Option<A>) -> SpawnResult<R> {
        let a = arg.ok_or(SpawnError::ArityMismatch { expected: 1, provided: 0 })?;
        (self.f)(a).map_err(|e| SpawnError::Failed(e.to_string()))
    }
}


/// Список задач. Позиция элемента в списке является номером задачи.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskBatch<A> {
    tasks: Vec<Option<A>>,
}

impl<A> TaskBatch<A> {
    /// Пустой (не заданный) список задач
    pub fn absent() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Список, где отдельные задачи могут быть без аргумента.
    /// Для `None` функция вызывается без аргументов.
    pub fn from_optional(tasks: Vec<Option<A>>) -> Self {
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Если список пуст, функция исполняется `limit` раз без аргументов
    pub fn or_synthesize(self, limit: usize) -> Self {
        if !self.tasks.is_empty() {
            return self;
        }
        Self { tasks: (0..limit).map(|_| None).collect() }
    }

    pub(crate) fn into_inner(self) -> Vec<Option<A>> {
        self.tasks
    }
}

impl<A> Default for TaskBatch<A> {
    fn default() -> Self {
        Self::absent()
    }
}

impl<A> From<Vec<A>> for TaskBatch<A> {
    fn from(items: Vec<A>) -> Self {
        Self { tasks: items.into_iter().map(Some).collect() }
    }
}

impl<A> From<Option<Vec<A>>> for TaskBatch<A> {
    fn from(items: Option<Vec<A>>) -> Self {
        items.map(Self::from).unwrap_or_default()
    }
}

impl<A> FromIterator<A> for TaskBatch<A> {
    fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
        Self { tasks: iter.into_iter().map(Some).collect() }
    }
}
