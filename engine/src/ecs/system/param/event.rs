use crate::ecs::{
    event,
    system::{Parameter, command::CommandBuffer},
    world,
};

pub struct Producer<'w, E: event::Event> {
    stream: &'w mut event::Stream<E>,
}

impl<'w, E: event::Event> Producer<'w, E> {
    pub fn send(&mut self, event: E) {
        self.stream.send(event);
    }
}

impl<E: event::Event> Parameter for Producer<'_, E> {
    type Value<'w, 's> = Producer<'w, E>;
    type State = ();

    fn build_state(_world: &mut world::World) -> Self::State {}

    fn required_access(world: &world::World) -> world::AccessRequest {
        // Mutable access to active buffer marker
        world::AccessRequest::to_resources(&[], &[world.resources().register_event::<E>().0])
    }

    unsafe fn extract<'w, 's>(
        shard: &'w mut world::Shard<'_>,
        _state: &'s mut Self::State,
        _command_buffer: &'w CommandBuffer,
    ) -> Self::Value<'w, 's> {
        Producer {
            stream: shard
                .events_mut()
                .stream_mut::<E>()
                .expect("unable to get event stream"),
        }
    }
}

pub struct Consumer<'w, E: event::Event> {
    stream: &'w event::Stream<E>,
}

impl<'w, E: event::Event> Consumer<'w, E> {
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.stream.iter()
    }

    pub fn len(&self) -> usize {
        self.stream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }
}

impl<E: event::Event> Parameter for Consumer<'_, E> {
    type Value<'w, 's> = Consumer<'w, E>;
    type State = ();

    fn build_state(_world: &mut world::World) -> Self::State {}

    fn required_access(world: &world::World) -> world::AccessRequest {
        // Immutable access to stable buffer marker
        world::AccessRequest::to_resources(&[world.resources().register_event::<E>().1], &[])
    }

    unsafe fn extract<'w, 's>(
        shard: &'w mut world::Shard<'_>,
        _state: &'s mut Self::State,
        _command_buffer: &'w CommandBuffer,
    ) -> Self::Value<'w, 's> {
        Consumer {
            stream: shard
                .events()
                .stream::<E>()
                .expect("unable to get event stream"),
        }
    }
}
